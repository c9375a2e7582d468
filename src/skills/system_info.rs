use super::{Keywords, Skill, SkillContext};
use crate::error::SkillError;
use crate::types::{Intent, SkillResult};
use std::sync::LazyLock;

static KEYWORDS: LazyLock<Keywords> = LazyLock::new(|| {
    Keywords::new(
        &["机器配置", "硬件信息", "配置", "内存", "主机配置"],
        &[
            "cpu",
            "gpu",
            "hardware",
            "specs",
            "system info",
            "machine config",
            "machine configuration",
        ],
    )
});

/// Prints OS, CPU, memory, GPU and disk layout in one table.
const INSPECTION_SCRIPT: &str = r#"sh <<'SH'
have() { [ -n "$(command -v "$1")" ]; }
row() { printf '%-12s | %s\n' "$1" "$2"; }
mem_total() {
    if [ -r /proc/meminfo ]; then
        awk '/^MemTotal/ { printf "%.2f GB", $2 / 1024 / 1024 }' /proc/meminfo
    else
        echo unknown
    fi
}
gpu_names() {
    if have nvidia-smi; then
        nvidia-smi --query-gpu=name --format=csv,noheader 2>&1 | paste -sd ',' -
    else
        echo "no GPU detected"
    fi
}
cpu_model() {
    model=""
    if [ -r /proc/cpuinfo ]; then
        model=$(awk -F': ' '/^model name/ { print $2; exit }' /proc/cpuinfo)
    fi
    echo "${model:-$(uname -m)}"
}
cpu_cores() {
    if have nproc; then nproc; else getconf _NPROCESSORS_ONLN; fi
}
echo "Machine configuration:"
echo "--------------------------------------------"
row "OS" "$(uname -srm)"
row "Kernel" "$(uname -r)"
row "CPU" "$(cpu_model)"
row "CPU cores" "$(cpu_cores)"
row "Memory" "$(mem_total)"
row "GPU" "$(gpu_names)"
echo "--------------------------------------------"
echo
echo "Disks (lsblk):"
if have lsblk; then
    lsblk -o NAME,SIZE,TYPE,MOUNTPOINT || echo "lsblk could not list disks"
else
    echo "lsblk is not available"
fi
SH"#;

/// Answers "what hardware is this" with a fixed inspection script.
pub struct SystemInfoSkill;

impl Skill for SystemInfoSkill {
    fn name(&self) -> &'static str {
        "system_info"
    }

    fn matches(&self, query: &str, _ctx: &SkillContext<'_>) -> Result<bool, SkillError> {
        if query.to_lowercase().contains("mysql") {
            return Ok(false);
        }
        Ok(KEYWORDS.matches(query))
    }

    fn build(&self, _query: &str, _ctx: &SkillContext<'_>) -> Result<SkillResult, SkillError> {
        Ok(SkillResult {
            intent: Some(Intent::RunCommand),
            command: Some(INSPECTION_SCRIPT.to_string()),
            explanation: Some(
                "I'll collect CPU, memory and GPU details and show the disk layout.".to_string(),
            ),
            needs_summary: true,
            response: None,
        })
    }
}

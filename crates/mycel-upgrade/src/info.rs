//! `upgrade-info.json`: the hand-off between the halting binary and its successor

use crate::error::{UpgradeError, UpgradeResult};
use crate::plan::Plan;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name inside the node's data directory
pub const UPGRADE_INFO_FILE: &str = "upgrade-info.json";

/// Location of the upgrade-info file under `data_dir`
pub fn upgrade_info_path(data_dir: &Path) -> PathBuf {
    data_dir.join(UPGRADE_INFO_FILE)
}

/// Write the plan the node is halting for
pub fn write_upgrade_info(data_dir: &Path, plan: &Plan) -> UpgradeResult<()> {
    fs::create_dir_all(data_dir).map_err(|e| UpgradeError::InfoWrite(e.to_string()))?;
    let json =
        serde_json::to_vec_pretty(plan).map_err(|e| UpgradeError::InfoWrite(e.to_string()))?;
    let path = upgrade_info_path(data_dir);
    fs::write(&path, json).map_err(|e| UpgradeError::InfoWrite(e.to_string()))?;
    tracing::info!(path = %path.display(), name = %plan.name, "wrote upgrade info");
    Ok(())
}

/// Read the plan a previous binary halted for. A missing or empty file means none.
pub fn read_upgrade_info(data_dir: &Path) -> UpgradeResult<Option<Plan>> {
    let path = upgrade_info_path(data_dir);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(UpgradeError::PlanRead(e.to_string())),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let plan: Plan = serde_json::from_slice(&bytes)
        .map_err(|e| UpgradeError::PlanRead(format!("{}: {}", path.display(), e)))?;
    plan.validate()
        .map_err(|e| UpgradeError::PlanRead(format!("{}: {}", path.display(), e)))?;
    Ok(Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let plan = Plan::new("v2.0.0", 1200).with_info("https://example.invalid/v2.0.0");
        write_upgrade_info(dir.path(), &plan).unwrap();
        assert_eq!(read_upgrade_info(dir.path()).unwrap(), Some(plan));
    }

    #[test]
    fn test_missing_or_empty_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_upgrade_info(dir.path()).unwrap(), None);

        fs::write(upgrade_info_path(dir.path()), b"\n").unwrap();
        assert_eq!(read_upgrade_info(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(upgrade_info_path(dir.path()), b"{\"name\": 5}").unwrap();
        let err = read_upgrade_info(dir.path()).unwrap_err();
        assert!(matches!(err, UpgradeError::PlanRead(_)));
        assert!(err.is_fatal());
    }
}

// src/output.rs

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use crate::group::Groups;

/// Write the grouped tables as YAML. The file is written next to the target
/// and renamed over it, so a failed run never leaves half a document behind.
pub fn write_yaml(path: &Path, groups: &Groups) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.yaml".to_string());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let tmp = File::create(&tmp_path).with_context(|| format!("creating {tmp_path:?}"))?;
    let mut writer = BufWriter::new(tmp);
    serde_yaml::to_writer(&mut writer, groups).context("serializing groups to YAML")?;
    writer.flush()?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {tmp_path:?} -> {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Group, GroupTable};
    use crate::parse::{Dimension, Extent, FieldRecord};
    use crate::transform::{CType, SpecType};
    use tempfile::tempdir;

    #[test]
    fn groups_round_out_to_yaml() -> Result<()> {
        let row = FieldRecord::default()
            .with_extent(Dimension::Bits, Extent::Width(32))
            .with_text("name", "cdw0");
        let mut groups = Groups::new();
        groups.insert(
            "admin_commands".to_string(),
            Group {
                tables: vec![GroupTable {
                    title: "".to_string(),
                    number: -1,
                    rows: vec![row],
                    headings: vec!["bits".to_string(), "name".to_string()],
                    width: Some(32),
                }],
                spec_type: SpecType::Command,
                c_type: CType::Struct,
            },
        );

        let dir = tempdir()?;
        let path = dir.path().join("nested").join("output.yaml");
        write_yaml(&path, &groups)?;

        let yaml = fs::read_to_string(&path)?;
        assert!(yaml.starts_with("admin_commands:"));
        assert!(yaml.contains("spec_type: command"));
        assert!(yaml.contains("c_type: struct"));
        assert!(yaml.contains("type: 32"));
        assert!(yaml.contains("name: cdw0"));
        assert!(yaml.contains("number: -1"));
        assert!(!dir.path().join("nested").join(".output.yaml.tmp").exists());
        Ok(())
    }
}

use super::manifest::now_timestamp;
use shell_words::quote;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const RESTORE_SCRIPT: &str = "restore_files.sh";

/// Shell script that moves one session's files back. `files` holds
/// `(original_path, quarantine_path)` pairs relative to the repository root.
/// Every path and the session id reach the shell single-quoted.
pub fn render_restore_script(session_id: &str, files: &[(String, String)]) -> String {
    let mut script = String::new();
    let _ = writeln!(script, "#!/bin/bash");
    let _ = writeln!(script, "# Restore script for one quarantine session");
    let _ = writeln!(script, "# Generated: {}", now_timestamp());
    let _ = writeln!(script);
    let _ = writeln!(script, "set -e");
    let _ = writeln!(script);
    let _ = writeln!(script, r#"SCRIPT_DIR="$(cd "$(dirname "${{BASH_SOURCE[0]}}")" && pwd)""#);
    let _ = writeln!(script, r#"REPO_ROOT="$(cd "$SCRIPT_DIR/../.." && pwd)""#);
    let _ = writeln!(script);
    let _ = writeln!(script, r#"echo "Restoring files from quarantine session: "{}"#, quote(session_id));
    let _ = writeln!(script);

    for (original, quarantined) in files {
        let target = quote(original);
        if let Some((parent, _)) = original.rsplit_once('/') {
            let _ = writeln!(script, r#"mkdir -p "$REPO_ROOT"/{}"#, quote(parent));
        }
        let _ = writeln!(script, r#"mv "$REPO_ROOT"/{} "$REPO_ROOT"/{}"#, quote(quarantined), target);
        let _ = writeln!(script, r#"echo "Restored: "{}"#, target);
        let _ = writeln!(script);
    }

    let _ = writeln!(script, r#"echo """#);
    let _ = writeln!(script, r#"echo "All files restored successfully!""#);
    let _ = writeln!(
        script,
        r#"echo "Remember to remove the quarantine/"{}" directory after verification""#,
        quote(session_id)
    );
    script
}

/// Write the script into the session directory and mark it executable.
pub fn write_restore_script(
    session_dir: &Path,
    session_id: &str,
    files: &[(String, String)],
) -> io::Result<PathBuf> {
    fs::create_dir_all(session_dir)?;
    let path = session_dir.join(RESTORE_SCRIPT);
    fs::write(&path, render_restore_script(session_id, files))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_moves_files_back() {
        let files = vec![
            ("src/old.py".to_string(), "quarantine/s1/src/old.py".to_string()),
            ("top.md".to_string(), "quarantine/s1/top.md".to_string()),
        ];
        let script = render_restore_script("s1", &files);
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains(r#"mkdir -p "$REPO_ROOT"/src"#));
        assert!(script.contains(r#"mv "$REPO_ROOT"/quarantine/s1/src/old.py "$REPO_ROOT"/src/old.py"#));
        assert!(script.contains(r#"mv "$REPO_ROOT"/quarantine/s1/top.md "$REPO_ROOT"/top.md"#));
        assert!(script.contains("${BASH_SOURCE[0]}"));
    }

    #[test]
    fn test_paths_are_single_quoted() {
        let files = vec![(
            "src/x$(touch owned).py".to_string(),
            "quarantine/s1/src/x$(touch owned).py".to_string(),
        )];
        let script = render_restore_script("s1", &files);
        assert!(script.contains(r#"mv "$REPO_ROOT"/'quarantine/s1/src/x$(touch owned).py' "$REPO_ROOT"/'src/x$(touch owned).py'"#));
        assert!(script.contains(r#"echo "Restored: "'src/x$(touch owned).py'"#));
        assert!(!script.contains(r#""$REPO_ROOT/src/x$("#));
    }
}

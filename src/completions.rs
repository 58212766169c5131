use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap_complete::{generate, Shell};

use crate::app::AppError;

const BIN_NAME: &str = "carmart";

pub fn generate_completions(shell: Shell, buf: &mut dyn Write) {
    let mut cmd = crate::cli::styled_command();
    generate(shell, &mut cmd, BIN_NAME, buf);
}

fn shell_from_name(raw: &str) -> Option<Shell> {
    let basename = raw.trim().rsplit('/').next()?;
    match basename.to_ascii_lowercase().as_str() {
        "bash" => Some(Shell::Bash),
        "zsh" => Some(Shell::Zsh),
        "fish" => Some(Shell::Fish),
        "elvish" => Some(Shell::Elvish),
        "powershell" | "pwsh" => Some(Shell::PowerShell),
        _ => None,
    }
}

pub fn detect_current_shell() -> Option<Shell> {
    shell_from_name(&std::env::var("SHELL").ok()?)
}

fn install_path(shell: Shell, home: &Path) -> Option<PathBuf> {
    match shell {
        Shell::Bash => Some(
            home.join(".local/share/bash-completion/completions")
                .join(BIN_NAME),
        ),
        Shell::Zsh => Some(home.join(".config/carmart/completions/carmart.zsh")),
        Shell::Fish => Some(home.join(".config/fish/completions/carmart.fish")),
        _ => None,
    }
}

fn install_into(shell: Shell, home: &Path) -> io::Result<PathBuf> {
    let path = install_path(shell, home).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no install path for {shell:?}"),
        )
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut buf = Vec::new();
    generate_completions(shell, &mut buf);
    std::fs::write(&path, buf)?;
    if shell == Shell::Zsh {
        source_from_zshrc(home, &path)?;
    }
    Ok(path)
}

fn source_from_zshrc(home: &Path, completions: &Path) -> io::Result<()> {
    let zshrc = home.join(".zshrc");
    let source_line = format!("source \"{}\"", completions.display());
    if zshrc.exists() && std::fs::read_to_string(&zshrc)?.contains(&source_line) {
        return Ok(());
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&zshrc)?;
    writeln!(file)?;
    writeln!(file, "# carmart shell completions")?;
    writeln!(file, "{source_line}")?;
    Ok(())
}

pub fn run_completions_command(shell_arg: Option<&str>, install: bool) -> Result<(), AppError> {
    let shell = match shell_arg {
        Some(name) => shell_from_name(name)
            .ok_or_else(|| AppError::InvalidArgument(format!("unknown shell '{name}'")))?,
        None => detect_current_shell().ok_or_else(|| {
            AppError::InvalidArgument(
                "unable to detect shell from $SHELL; pass a shell name".to_string(),
            )
        })?,
    };

    if install {
        let home = std::env::var_os("HOME").ok_or_else(|| {
            AppError::InvalidArgument("HOME is not set; cannot install completions".to_string())
        })?;
        let path = install_into(shell, Path::new(&home))?;
        tracing::info!(shell = ?shell, path = %path.display(), "completions installed");
        println!("completions installed to {}", path.display());
    } else {
        let mut stdout = io::stdout().lock();
        generate_completions(shell, &mut stdout);
    }
    Ok(())
}

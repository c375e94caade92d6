use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    /// 命令行本身有误
    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Core(#[from] vfs::Error),
}

pub type Result<T> = core::result::Result<T, ShellError>;

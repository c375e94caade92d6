//! 面向磁盘镜像的命令层：解析脚本中的命令，并调用分区层与文件系统层执行。

mod command;
mod error;
mod shell;
mod unit;

pub use self::{
    command::Command,
    error::{Result, ShellError},
    shell::{Report, Shell},
    unit::Unit,
};

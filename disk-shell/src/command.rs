//! # 命令解析
//!
//! 每行一条命令：命令名（不区分大小写）后跟若干`-key=value`参数或`-flag`开关，
//! 值可用双引号包裹以容纳空格。空行与`#`开头的行被忽略。

use std::collections::HashMap;
use std::path::PathBuf;

use partition::{Fit, PartType};

use crate::error::{Result, ShellError};
use crate::unit::Unit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MkDisk {
        size: u64,
        fit: Fit,
        path: PathBuf,
    },
    RmDisk {
        path: PathBuf,
    },
    FDisk {
        size: u64,
        path: PathBuf,
        kind: PartType,
        fit: Fit,
        name: String,
    },
    FDiskDelete {
        path: PathBuf,
        name: String,
    },
    Mount {
        path: PathBuf,
        name: String,
    },
    Unmount {
        id: String,
    },
    Mounted,
    MkFs {
        id: String,
    },
    MkDir {
        id: String,
        path: String,
        parents: bool,
    },
    MkFile {
        id: String,
        path: String,
        parents: bool,
        size: Option<u64>,
        content: Option<String>,
    },
    Cat {
        id: String,
        file: String,
    },
    Ls {
        id: String,
        path: String,
    },
}

impl Command {
    /// 解析一行，空行与注释返回空
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let tokens = tokenize(line)?;
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(None);
        };
        let mut args = Args::new(rest)?;

        let command = match name.to_ascii_lowercase().as_str() {
            "mkdisk" => Self::MkDisk {
                size: args.size("M", &["K", "M"])?,
                fit: args.fit("FF")?,
                path: args.required("path")?.into(),
            },
            "rmdisk" => Self::RmDisk {
                path: args.required("path")?.into(),
            },
            "fdisk" if args.has("delete") => {
                let mode = args.required("delete")?;
                if !mode.eq_ignore_ascii_case("full") {
                    return Err(ShellError::Parse(format!("unknown delete mode {mode:?}")));
                }
                Self::FDiskDelete {
                    path: args.required("path")?.into(),
                    name: args.required("name")?,
                }
            }
            "fdisk" => Self::FDisk {
                size: args.size("K", &["B", "K", "M"])?,
                path: args.required("path")?.into(),
                kind: args.optional("type").as_deref().unwrap_or("P").parse()?,
                fit: args.fit("WF")?,
                name: args.required("name")?,
            },
            "mount" => Self::Mount {
                path: args.required("path")?.into(),
                name: args.required("name")?,
            },
            "unmount" => Self::Unmount {
                id: args.required("id")?,
            },
            "mounted" => Self::Mounted,
            "mkfs" => {
                // 只支持完整格式化
                args.optional("type");
                Self::MkFs {
                    id: args.required("id")?,
                }
            }
            "mkdir" => Self::MkDir {
                id: args.required("id")?,
                path: args.required("path")?,
                parents: args.flag("p"),
            },
            "mkfile" => Self::MkFile {
                id: args.required("id")?,
                path: args.required("path")?,
                parents: args.flag("r"),
                size: args.optional("size").map(|size| file_size(&size)).transpose()?,
                content: args.optional("cont"),
            },
            "cat" => Self::Cat {
                id: args.required("id")?,
                file: args.required("file")?,
            },
            "ls" => Self::Ls {
                id: args.required("id")?,
                path: args.optional("path").unwrap_or_else(|| "/".to_owned()),
            },
            _ => return Err(ShellError::Parse(format!("unknown command {name:?}"))),
        };
        args.finish()?;

        Ok(Some(command))
    }
}

/// 按空白切分，双引号内的空白保留，引号本身去掉
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(core::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if quoted {
        return Err(ShellError::Parse("missing closing quote".to_owned()));
    }
    if pending {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_count(value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|_| ShellError::Parse(format!("invalid size {value:?}")))
}

/// 文件尺寸可以为0
fn file_size(value: &str) -> Result<u64> {
    match parse_count(value)? {
        size if size < 0 => Err(vfs::Error::InvalidSize(size).into()),
        size => Ok(size as u64),
    }
}

/// 尚未取用的参数；`finish`时有剩余即为未知参数
struct Args {
    values: HashMap<String, Option<String>>,
}

impl Args {
    fn new(tokens: &[String]) -> Result<Self> {
        let mut values = HashMap::new();
        for token in tokens {
            let Some(token) = token.strip_prefix('-') else {
                return Err(ShellError::Parse(format!("unexpected token {token:?}")));
            };
            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key, Some(value.to_owned())),
                None => (token, None),
            };
            if values.insert(key.to_ascii_lowercase(), value).is_some() {
                return Err(ShellError::Parse(format!("parameter -{key} given twice")));
            }
        }

        Ok(Self { values })
    }

    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn optional(&mut self, key: &str) -> Option<String> {
        self.values.remove(key).flatten()
    }

    fn required(&mut self, key: &str) -> Result<String> {
        self.optional(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ShellError::Parse(format!("missing parameter -{key}")))
    }

    fn flag(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    fn fit(&mut self, default: &str) -> Result<Fit> {
        let fit = self.optional("fit").unwrap_or_else(|| default.to_owned());
        Fit::parse(&fit).ok_or_else(|| ShellError::Parse(format!("unknown fit {fit:?}")))
    }

    /// `-size`乘以`-unit`，单位须在`allowed`之中
    fn size(&mut self, default_unit: &str, allowed: &[&str]) -> Result<u64> {
        let count = parse_count(&self.required("size")?)?;
        if count < 1 {
            return Err(vfs::Error::InvalidSize(count).into());
        }
        let unit = self.optional("unit").unwrap_or_else(|| default_unit.to_owned());
        let unit = allowed
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&unit))
            .then(|| Unit::parse(&unit))
            .flatten()
            .ok_or_else(|| ShellError::Parse(format!("unit {unit:?} not allowed here")))?;

        Ok(unit.bytes(count as u64))
    }

    fn finish(self) -> Result<()> {
        match self.values.keys().next() {
            Some(key) => Err(ShellError::Parse(format!("unknown parameter -{key}"))),
            None => Ok(()),
        }
    }
}

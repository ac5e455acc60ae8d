use derive_more::Display;
use enumflags2::BitFlags;
use sim_fs::Permission;

/// 一行脚本对应的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MakeDir(String),
    Create {
        path: String,
        size: usize,
        perm: BitFlags<Permission>,
    },
    Write {
        path: String,
        text: String,
    },
    Cat(String),
    Remove(String),
    Move {
        old: String,
        new: String,
    },
    RenameDir {
        path: String,
        name: String,
    },
    Chmod {
        path: String,
        perm: BitFlags<Permission>,
    },
    Stat(String),
    List(Option<String>),
    Tree,
    Find(String),
    Du(String),
    Df,
    Sync,
    /// 丢弃缓存中的数据，仅凭日志恢复
    Crash,
    Check,
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[display(fmt = "unknown command {:?}", _0)]
    UnknownCommand(String),
    #[display(fmt = "{}: missing {}", _0, _1)]
    MissingArgument(String, &'static str),
    #[display(fmt = "{}: too many arguments", _0)]
    TooManyArguments(String),
    #[display(fmt = "bad size {:?}", _0)]
    BadSize(String),
    #[display(fmt = "bad permission {:?}, expected an octal digit or `rwx`", _0)]
    BadPermission(String),
}

impl Command {
    /// 解析一行脚本；空行与 `#` 注释返回 `None`
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut args = Args {
            command: name,
            rest,
        };

        let command = match name {
            "mkdir" => Self::MakeDir(args.next("path")?),
            "create" => Self::Create {
                path: args.next("path")?,
                size: parse_size(&args.next("size")?)?,
                perm: parse_perm(&args.next("permission")?)?,
            },
            // 路径之后的整行都是要写入的文本
            "write" => Self::Write {
                path: args.next("path")?,
                text: args.remainder(),
            },
            "cat" => Self::Cat(args.next("path")?),
            "rm" => Self::Remove(args.next("path")?),
            "mv" => Self::Move {
                old: args.next("source")?,
                new: args.next("destination")?,
            },
            "rendir" => Self::RenameDir {
                path: args.next("path")?,
                name: args.next("name")?,
            },
            "chmod" => Self::Chmod {
                path: args.next("path")?,
                perm: parse_perm(&args.next("permission")?)?,
            },
            "stat" => Self::Stat(args.next("path")?),
            "ls" => Self::List(args.optional()),
            "tree" => Self::Tree,
            "find" => Self::Find(args.next("term")?),
            "du" => Self::Du(args.optional().unwrap_or_else(|| String::from("/"))),
            "df" => Self::Df,
            "sync" => Self::Sync,
            "crash" => Self::Crash,
            "check" => Self::Check,
            _ => return Err(ParseError::UnknownCommand(String::from(name))),
        };

        if !matches!(command, Self::Write { .. }) {
            args.finish()?;
        }
        Ok(Some(command))
    }
}

struct Args<'a> {
    command: &'a str,
    rest: &'a str,
}

impl Args<'_> {
    fn optional(&mut self) -> Option<String> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        let (arg, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        self.rest = rest;
        Some(String::from(arg))
    }

    fn next(&mut self, what: &'static str) -> Result<String, ParseError> {
        self.optional()
            .ok_or_else(|| ParseError::MissingArgument(String::from(self.command), what))
    }

    fn remainder(&mut self) -> String {
        let rest = String::from(self.rest.trim_start());
        self.rest = "";
        rest
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.rest.trim().is_empty() {
            Ok(())
        } else {
            Err(ParseError::TooManyArguments(String::from(self.command)))
        }
    }
}

fn parse_size(arg: &str) -> Result<usize, ParseError> {
    arg.parse()
        .map_err(|_| ParseError::BadSize(String::from(arg)))
}

/// `6` 或 `rw-` 两种写法
pub fn parse_perm(arg: &str) -> Result<BitFlags<Permission>, ParseError> {
    let bad = || ParseError::BadPermission(String::from(arg));

    if let [digit @ b'0'..=b'7'] = arg.as_bytes() {
        return BitFlags::from_bits(digit - b'0').map_err(|_| bad());
    }

    let [r, w, x] = arg.as_bytes() else {
        return Err(bad());
    };
    let mut perm = BitFlags::empty();
    for (&flag, expected, bit) in [
        (r, b'r', Permission::Read),
        (w, b'w', Permission::Write),
        (x, b'x', Permission::Execute),
    ] {
        match flag {
            b'-' => {}
            flag if flag == expected => perm |= bit,
            _ => return Err(bad()),
        }
    }
    Ok(perm)
}

/// `rwx` 形式的权限
pub fn perm_string(perm: BitFlags<Permission>) -> String {
    [
        (Permission::Read, 'r'),
        (Permission::Write, 'w'),
        (Permission::Execute, 'x'),
    ]
    .into_iter()
    .map(|(bit, c)| if perm.contains(bit) { c } else { '-' })
    .collect()
}

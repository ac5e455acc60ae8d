use enumflags2::bitflags;

/// 三位权限掩码，取值与 `rwx` 的八进制写法一致。
#[rustfmt::skip]
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Execute = 0b001,
    Write   = 0b010,
    Read    = 0b100,
}

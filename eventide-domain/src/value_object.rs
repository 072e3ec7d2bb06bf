//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象。这里定义事件溯源中两类序号：
//! 聚合内的 [`Version`] 与全局日志上的 [`GlobalPosition`]。
//!

use std::fmt;

use eventide_macros::value_object;

/// 聚合版本号，等于该聚合已提交事件的数量
///
/// 事件的聚合序号从 1 开始连续递增，版本 `n` 表示已应用序号 `1..=n` 的事件。
///
/// # 示例
///
/// ```
/// use eventide_domain::value_object::Version;
///
/// let v1 = Version::new();
/// assert_eq!(v1.value(), 0);
/// assert!(v1.is_new());
///
/// let v2 = v1.next();
/// assert_eq!(v2.value(), 1);
/// assert!(v2 > v1);
/// ```
#[value_object(ordered = true)]
pub struct Version(usize);

impl Version {
    /// 初始版本（尚无任何事件）
    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_value(value: usize) -> Self {
        Self(value)
    }

    /// 下一个版本号，即下一条事件的聚合序号
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub const fn value(&self) -> usize {
        self.0
    }

    /// 是否为初始版本
    pub fn is_new(&self) -> bool {
        self.0 == 0
    }

    /// 聚合是否已创建（版本大于零）
    pub fn is_created(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<usize> for Version {
    fn from(value: usize) -> Self {
        Self::from_value(value)
    }
}

impl From<Version> for usize {
    fn from(version: Version) -> Self {
        version.value()
    }
}

/// 全局日志游标
///
/// 值为最后一条已消费事件的全局序号；[`GlobalPosition::START`] 表示从头读取。
/// 由一次分页读取产生，原样交给下一次读取即可无重无漏地继续。
///
/// ```
/// use eventide_domain::value_object::GlobalPosition;
///
/// let start = GlobalPosition::START;
/// assert!(start.is_start());
/// assert!(GlobalPosition::from_value(3) > start);
/// ```
#[value_object(ordered = true)]
pub struct GlobalPosition(u64);

impl GlobalPosition {
    pub const START: GlobalPosition = GlobalPosition(0);

    pub const fn from_value(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn is_start(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for GlobalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//! 运行时能力校验。
//!
//! # 设计背景（Why）
//! - 静态类型的 Sink 直接实现 [`LeveledSink`] / [`LegacySink`]，由编译器保证方法齐全；
//! - 来自脚本宿主、插件或 FFI 的对象只能在运行时按名字描述自己的成员，这类对象通过
//!   [`SinkObject`] 暴露，并在注册时由 [`CapabilityValidator`] 显式校验；
//! - 校验成功后产出持有已解析方法的适配器，之后的每次投递不再按名字查找。
//!
//! # 契约说明（What）
//! - 旧式协议：两个方法名任一缺失或不可调用，错误同时点名两者；
//! - 带级别协议：按 debug → info → warning → error 的固定顺序检查，只报告第一个缺失者；
//! - “不可调用”包含成员存在但为普通值（例如整数）的情况；
//! - 校验是纯函数，失败不产生任何副作用。

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ValidationError;
use crate::severity::SeverityLevel;
use crate::sink::{LegacySink, LeveledSink};

/// 可调用成员：接收一段文本，无返回值。
pub type MethodFn = Arc<dyn Fn(&str) + Send + Sync>;

/// 不可调用成员持有的普通值。
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

/// 运行时对象上的一个具名成员。
#[derive(Clone)]
pub enum Member {
    Method(MethodFn),
    Value(AttrValue),
}

impl Member {
    /// 仅当成员可调用时返回方法句柄。
    pub fn as_method(&self) -> Option<&MethodFn> {
        match self {
            Member::Method(method) => Some(method),
            Member::Value(_) => None,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => f.write_str("Method(<fn>)"),
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// 按名字暴露成员的运行时对象。
///
/// # 教案式说明
/// - **意图（Why）**：为无法在编译期实现 Sink trait 的对象提供统一的描述方式；
/// - **契约（What）**：`member` 对不存在的名字返回 `None`；返回值可被校验器克隆并长期持有，
///   因此实现方不应假定成员在注册后还会被再次查询。
pub trait SinkObject: Send + Sync {
    fn member(&self, name: &str) -> Option<Member>;
}

/// 以名字为键的成员表，最常见的 [`SinkObject`] 实现。
#[derive(Clone, Debug, Default)]
pub struct DynamicSink {
    members: BTreeMap<String, Member>,
}

impl DynamicSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加（或覆盖）一个可调用成员。
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.members
            .insert(name.into(), Member::Method(Arc::new(method)));
        self
    }

    /// 添加（或覆盖）一个不可调用的普通值成员。
    pub fn with_value(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.members.insert(name.into(), Member::Value(value));
        self
    }
}

impl SinkObject for DynamicSink {
    fn member(&self, name: &str) -> Option<Member> {
        self.members.get(name).cloned()
    }
}

/// 旧式协议使用的一对方法名，默认 `info` / `warning`。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyMethodNames {
    info: Cow<'static, str>,
    warning: Cow<'static, str>,
}

impl LegacyMethodNames {
    pub fn new(info: impl Into<Cow<'static, str>>, warning: impl Into<Cow<'static, str>>) -> Self {
        Self {
            info: info.into(),
            warning: warning.into(),
        }
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn warning(&self) -> &str {
        &self.warning
    }
}

impl Default for LegacyMethodNames {
    fn default() -> Self {
        Self::new("info", "warning")
    }
}

/// 带级别协议的固定检查顺序。
const LEVELED_CHECK_ORDER: [SeverityLevel; 4] = [
    SeverityLevel::Debug,
    SeverityLevel::Info,
    SeverityLevel::Warning,
    SeverityLevel::Error,
];

/// 注册期能力校验器。
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityValidator;

impl CapabilityValidator {
    /// 校验旧式协议对象，成功时返回持有两个已解析方法的适配器。
    pub fn validate_legacy(
        object: &dyn SinkObject,
        names: &LegacyMethodNames,
    ) -> Result<ResolvedLegacySink, ValidationError> {
        let info = resolve(object, names.info());
        let warning = resolve(object, names.warning());
        match (info, warning) {
            (Some(info), Some(warning)) => Ok(ResolvedLegacySink { info, warning }),
            _ => Err(ValidationError::MissingLegacyMethods {
                info: names.info().to_owned(),
                warning: names.warning().to_owned(),
            }),
        }
    }

    /// 校验带级别协议对象，按固定顺序报告第一个缺失或不可调用的方法。
    pub fn validate_leveled(
        object: &dyn SinkObject,
    ) -> Result<ResolvedLeveledSink, ValidationError> {
        let mut methods = Vec::with_capacity(LEVELED_CHECK_ORDER.len());
        for level in LEVELED_CHECK_ORDER {
            let method = resolve(object, level.method_name()).ok_or(
                ValidationError::MissingLeveledMethod {
                    method: level.method_name(),
                },
            )?;
            methods.push((level, method));
        }
        Ok(ResolvedLeveledSink { methods })
    }

    /// 带级别协议要求的方法名，按检查顺序排列。
    pub fn leveled_requirements() -> [&'static str; 4] {
        LEVELED_CHECK_ORDER.map(SeverityLevel::method_name)
    }
}

fn resolve(object: &dyn SinkObject, name: &str) -> Option<MethodFn> {
    object
        .member(name)
        .and_then(|member| member.as_method().cloned())
}

/// 校验通过的带级别对象，四个级别各持有一个已解析方法。
pub struct ResolvedLeveledSink {
    methods: Vec<(SeverityLevel, MethodFn)>,
}

impl ResolvedLeveledSink {
    fn call(&self, level: SeverityLevel, message: &str) {
        if let Some((_, method)) = self.methods.iter().find(|(bound, _)| *bound == level) {
            method(message);
        }
    }
}

impl fmt::Debug for ResolvedLeveledSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedLeveledSink").finish_non_exhaustive()
    }
}

impl LeveledSink for ResolvedLeveledSink {
    fn debug(&self, message: &str) {
        self.call(SeverityLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.call(SeverityLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.call(SeverityLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.call(SeverityLevel::Error, message);
    }
}

/// 校验通过的旧式对象，方法名已在注册时解析。
pub struct ResolvedLegacySink {
    info: MethodFn,
    warning: MethodFn,
}

impl fmt::Debug for ResolvedLegacySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedLegacySink").finish_non_exhaustive()
    }
}

impl LegacySink for ResolvedLegacySink {
    fn info(&self, message: &str) {
        (self.info)(message);
    }

    fn warning(&self, message: &str) {
        (self.warning)(message);
    }
}

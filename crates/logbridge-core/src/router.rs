//! 严重度 → Sink 方法的路由表。
//!
//! | 线上编码 | 方法 |
//! |---|---|
//! | `< 0` | `error` |
//! | `0` | `warning` |
//! | `1` | `info` |
//! | `>= 2` | `debug` |
//!
//! 无级别通道只有 `info` / `warning` 两条固定路由，分类在消息到达桥接层之前就已确定。

use crate::severity::SeverityLevel;
use crate::sink::{LegacySink, LeveledSink};

/// 旧式协议的两条路由。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegacyRoute {
    Info,
    Warning,
}

impl LegacyRoute {
    /// 带级别消息降级到旧式槽位时使用的路由。
    pub const fn for_severity(level: SeverityLevel) -> Self {
        match level {
            SeverityLevel::Error | SeverityLevel::Warning => LegacyRoute::Warning,
            SeverityLevel::Info | SeverityLevel::Debug => LegacyRoute::Info,
        }
    }
}

/// 每条消息恰好调用一个 Sink 方法。
#[derive(Debug, Default, Clone, Copy)]
pub struct SeverityRouter;

impl SeverityRouter {
    pub fn route_leveled(sink: &dyn LeveledSink, level: SeverityLevel, message: &str) {
        match level {
            SeverityLevel::Error => sink.error(message),
            SeverityLevel::Warning => sink.warning(message),
            SeverityLevel::Info => sink.info(message),
            SeverityLevel::Debug => sink.debug(message),
        }
    }

    pub fn route_legacy(sink: &dyn LegacySink, route: LegacyRoute, message: &str) {
        match route {
            LegacyRoute::Info => sink.info(message),
            LegacyRoute::Warning => sink.warning(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_stubs::CapturingSink;

    #[test]
    fn each_level_reaches_exactly_one_method() {
        for code in [-1, 0, 1, 2] {
            let sink = CapturingSink::new();
            let level = SeverityLevel::from_wire(code);
            SeverityRouter::route_leveled(&sink, level, "payload");

            let seen = sink.snapshot();
            assert_eq!(seen.total(), 1, "code {code} delivered more than once");
            assert_eq!(seen.leveled(level), ["payload"]);
        }
    }

    #[test]
    fn legacy_routes_are_fixed() {
        let sink = CapturingSink::new();
        SeverityRouter::route_legacy(&sink, LegacyRoute::Info, "i");
        SeverityRouter::route_legacy(&sink, LegacyRoute::Warning, "w");

        let seen = sink.snapshot();
        assert_eq!(seen.legacy_info, ["i"]);
        assert_eq!(seen.legacy_warning, ["w"]);
    }

    #[test]
    fn fallback_route_groups_by_importance() {
        assert_eq!(
            LegacyRoute::for_severity(SeverityLevel::Error),
            LegacyRoute::Warning
        );
        assert_eq!(
            LegacyRoute::for_severity(SeverityLevel::Warning),
            LegacyRoute::Warning
        );
        assert_eq!(LegacyRoute::for_severity(SeverityLevel::Info), LegacyRoute::Info);
        assert_eq!(LegacyRoute::for_severity(SeverityLevel::Debug), LegacyRoute::Info);
    }
}

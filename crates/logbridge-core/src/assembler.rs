use std::borrow::Cow;
use std::collections::HashMap;
use std::str;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::config::{AssemblyMode, DecodePolicy};

/// 原生消息无法投递的原因，仅用于边界内部分类与统计，不会暴露给 Sink 或调用方。
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeAnomaly {
    #[error("native message pointer was null")]
    NullPointer,
    #[error("native message is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
    #[error("native message is empty after trimming")]
    Blank,
}

/// 把原生字节变成“修剪后、非空、完整”的消息。
///
/// # 教案式说明
/// - **意图（Why）**：Sink 永远不应看到空串、纯空白或半截消息；
/// - **逻辑（How）**：
///   - 带级别通道使用 [`decode`](Self::decode)：每次调用独立解码、修剪，空则丢弃；
///   - 无级别通道使用 [`assemble`](Self::assemble)：默认的 `LineBuffered` 模式按调用线程累积分块，
///     遇到空白块或以换行结尾的块时整体产出，`PerCall` 模式与 `decode` 相同；
/// - **契约（What）**：返回的 `String` 一定非空且两端无空白；任一分块解码失败时整行丢弃，
///   已缓存的前缀不会在之后被单独产出；
/// - **清理**：缓存只在所属线程成行时收缩，原生工作线程退出前未成行的内容由
///   [`flush_all`](Self::flush_all) 统一取出；
/// - **权衡（Trade-offs）**：分块缓冲按 `ThreadId` 隔离，多个原生工作线程交错输出时互不污染；
///   代价是一次加锁与一次哈希查找，日志路径对此不敏感。
#[derive(Debug)]
pub struct MessageAssembler {
    decode: DecodePolicy,
    assembly: AssemblyMode,
    partial: Mutex<HashMap<ThreadId, String>>,
}

impl MessageAssembler {
    pub fn new(decode: DecodePolicy, assembly: AssemblyMode) -> Self {
        Self {
            decode,
            assembly,
            partial: Mutex::new(HashMap::new()),
        }
    }

    /// 单次调用即一条完整消息。
    pub fn decode(&self, raw: &[u8]) -> Result<String, DecodeAnomaly> {
        let text = decode_text(self.decode, raw)?;
        finish(&text)
    }

    /// 无级别通道的拼装入口；`Ok(None)` 表示分块已缓存、尚未成行。
    pub fn assemble(&self, raw: &[u8]) -> Result<Option<String>, DecodeAnomaly> {
        match self.assembly {
            AssemblyMode::PerCall => self.decode(raw).map(Some),
            AssemblyMode::LineBuffered => self.assemble_chunk(raw),
        }
    }

    /// 取出当前线程尚未成行的缓存内容。
    pub fn flush_current_thread(&self) -> Option<String> {
        let pending = self.partial.lock().remove(&thread::current().id())?;
        finish(&pending).ok()
    }

    /// 取出所有线程的未成行缓存，空白内容直接丢弃。
    ///
    /// 用于原生训练结束或工作线程退出后回收残留分块，调用后缓存表为空。
    pub fn flush_all(&self) -> Vec<String> {
        let drained: Vec<String> = self.partial.lock().drain().map(|(_, text)| text).collect();
        drained
            .iter()
            .filter_map(|text| finish(text).ok())
            .collect()
    }

    /// 是否存在任一线程的未成行缓存。
    pub fn has_pending(&self) -> bool {
        !self.partial.lock().is_empty()
    }

    fn assemble_chunk(&self, raw: &[u8]) -> Result<Option<String>, DecodeAnomaly> {
        let id = thread::current().id();
        let chunk = match decode_text(self.decode, raw) {
            Ok(chunk) => chunk,
            Err(anomaly) => {
                self.partial.lock().remove(&id);
                return Err(anomaly);
            }
        };
        let closes_line = chunk.trim().is_empty() || chunk.ends_with('\n');

        let mut partial = self.partial.lock();
        if !closes_line {
            partial.entry(id).or_default().push_str(&chunk);
            return Ok(None);
        }

        let mut line = partial.remove(&id).unwrap_or_default();
        drop(partial);
        line.push_str(&chunk);
        finish(&line).map(Some)
    }
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new(DecodePolicy::default(), AssemblyMode::default())
    }
}

fn decode_text(policy: DecodePolicy, raw: &[u8]) -> Result<Cow<'_, str>, DecodeAnomaly> {
    match policy {
        DecodePolicy::Strict => str::from_utf8(raw)
            .map(Cow::Borrowed)
            .map_err(|err| DecodeAnomaly::InvalidUtf8 {
                valid_up_to: err.valid_up_to(),
            }),
        DecodePolicy::Lossy => Ok(String::from_utf8_lossy(raw)),
    }
}

fn finish(text: &str) -> Result<String, DecodeAnomaly> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(DecodeAnomaly::Blank)
    } else {
        Ok(trimmed.to_owned())
    }
}

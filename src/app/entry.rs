//! 窗口内编号输入
//!
//! “设定编号”不弹对话框：进入输入状态后逐位累积数字，回车确认、Esc 取消、退格删除。
//! 校验统一走 `ImageId::parse_in_range`，窗口层只负责转发按键。

use crate::image_pipeline::{IdentifierError, ImageId};

/// 单次输入最多接受的位数（`u32::MAX` 共 10 位）。
const MAX_DIGITS: usize = 10;

/// 一次按键的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKey {
    /// 缓冲区内容变化（或按键被忽略），需要刷新提示。
    Pending,
    /// 输入被取消。
    Cancelled,
    /// 输入完成。
    Confirmed(Result<ImageId, IdentifierError>),
}

#[derive(Debug, Default)]
pub struct DigitEntry {
    buffer: Option<String>,
}

impl DigitEntry {
    /// 开始输入（清空之前的内容）。
    pub fn begin(&mut self) {
        self.buffer = Some(String::new());
    }

    pub fn is_active(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn text(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    /// 标题栏上的输入提示。
    pub fn prompt(&self, max: u32) -> Option<String> {
        self.buffer
            .as_ref()
            .map(|digits| format!("Gary Viewer - Enter number (1-{}): {}_", max, digits))
    }

    /// 处理一个字符；未处于输入状态时返回 `None`，按键交还窗口默认处理。
    pub fn press(&mut self, ch: char, max: u32) -> Option<EntryKey> {
        let buffer = self.buffer.as_mut()?;

        let key = match ch {
            '0'..='9' => {
                if buffer.len() < MAX_DIGITS {
                    buffer.push(ch);
                }
                EntryKey::Pending
            }
            '\u{8}' => {
                buffer.pop();
                EntryKey::Pending
            }
            '\u{1b}' => {
                self.buffer = None;
                EntryKey::Cancelled
            }
            '\r' | '\n' => {
                let result = ImageId::parse_in_range(buffer, max);
                self.buffer = None;
                EntryKey::Confirmed(result)
            }
            _ => EntryKey::Pending,
        };
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_all(entry: &mut DigitEntry, text: &str, max: u32) -> Option<EntryKey> {
        let mut last = None;
        for ch in text.chars() {
            last = entry.press(ch, max);
        }
        last
    }

    #[test]
    fn inactive_entry_ignores_keys() {
        let mut entry = DigitEntry::default();
        assert_eq!(entry.press('7', 640), None);
        assert!(!entry.is_active());
    }

    #[test]
    fn digits_then_enter_confirms_identifier() {
        let mut entry = DigitEntry::default();
        entry.begin();
        let key = type_all(&mut entry, "42\r", 640);
        assert_eq!(key, Some(EntryKey::Confirmed(Ok(ImageId::new(42).expect("valid id")))));
        assert!(!entry.is_active());
    }

    #[test]
    fn out_of_range_is_reported_on_confirm() {
        let mut entry = DigitEntry::default();
        entry.begin();
        let key = type_all(&mut entry, "641\r", 640);
        assert_eq!(
            key,
            Some(EntryKey::Confirmed(Err(IdentifierError::OutOfRange { value: 641, max: 640 })))
        );
    }

    #[test]
    fn enter_without_digits_is_empty_error() {
        let mut entry = DigitEntry::default();
        entry.begin();
        assert_eq!(entry.press('\r', 640), Some(EntryKey::Confirmed(Err(IdentifierError::Empty))));
    }

    #[test]
    fn backspace_and_letters() {
        let mut entry = DigitEntry::default();
        entry.begin();
        type_all(&mut entry, "12a3\u{8}", 640);
        assert_eq!(entry.text(), Some("12"));
        assert_eq!(entry.prompt(640).as_deref(), Some("Gary Viewer - Enter number (1-640): 12_"));
    }

    #[test]
    fn escape_cancels() {
        let mut entry = DigitEntry::default();
        entry.begin();
        entry.press('5', 640);
        assert_eq!(entry.press('\u{1b}', 640), Some(EntryKey::Cancelled));
        assert_eq!(entry.text(), None);
    }

    #[test]
    fn digit_count_is_capped() {
        let mut entry = DigitEntry::default();
        entry.begin();
        type_all(&mut entry, "123456789012345", 640);
        assert_eq!(entry.text().map(str::len), Some(MAX_DIGITS));
    }
}

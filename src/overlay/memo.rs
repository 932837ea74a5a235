use std::collections::HashMap;

use super::side::Side;

/// Observable row fields tracked for change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name,
    Record,
    Deck,
    Flag,
    Score,
    LifePoints,
    Phase,
    CardHighlight,
    CardFlipped,
}

/// Last applied value of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Flag(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Per-side record of the last value pushed downstream for each field.
#[derive(Debug, Default)]
pub struct FieldMemo {
    applied: HashMap<(Side, FieldKey), FieldValue>,
}

impl FieldMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and report whether it differs from the last one.
    pub fn observe(&mut self, side: Side, key: FieldKey, value: impl Into<FieldValue>) -> bool {
        let value = value.into();
        match self.applied.get(&(side, key)) {
            Some(previous) if *previous == value => false,
            _ => {
                self.applied.insert((side, key), value);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_changes() {
        let mut memo = FieldMemo::new();
        assert!(memo.observe(Side::Left, FieldKey::Score, 1));
        assert!(!memo.observe(Side::Left, FieldKey::Score, 1));
        assert!(memo.observe(Side::Right, FieldKey::Score, 1));
        assert!(memo.observe(Side::Left, FieldKey::Score, 2));
    }
}

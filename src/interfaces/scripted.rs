use crate::domain::pin::{PinRequest, PinResponse};
use crate::domain::ports::InteractionSurface;
use crate::error::{PinpadError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use zeroize::Zeroizing;

/// One pre-recorded answer. Scripted PINs are zeroized when dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedEntry {
    Pin(Zeroizing<String>),
    Cancel,
}

impl ScriptedEntry {
    /// Parses `c` or `cancel` as a cancellation and anything else as a PIN.
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();
        if entry.eq_ignore_ascii_case("c") || entry.eq_ignore_ascii_case("cancel") {
            Self::Cancel
        } else {
            Self::Pin(Zeroizing::new(entry.to_string()))
        }
    }
}

/// Answers PIN prompts from a fixed script, in order.
///
/// Useful for unattended runs and tests. Running out of entries is an
/// interaction failure. Every request served is recorded.
#[derive(Default)]
pub struct ScriptedSurface {
    entries: Mutex<VecDeque<ScriptedEntry>>,
    seen: Mutex<Vec<PinRequest>>,
}

impl ScriptedSurface {
    pub fn new(entries: impl IntoIterator<Item = ScriptedEntry>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Builds a script from a comma-separated list such as `0000,1234` or `c`.
    pub fn from_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .filter(|e| !e.trim().is_empty())
                .map(ScriptedEntry::parse),
        )
    }

    pub fn requests(&self) -> Vec<PinRequest> {
        self.seen.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl InteractionSurface for ScriptedSurface {
    async fn collect_pin(&self, request: &PinRequest) -> Result<PinResponse> {
        self.seen.lock().push(request.clone());
        match self.entries.lock().pop_front() {
            Some(ScriptedEntry::Pin(pin)) => Ok(PinResponse::pin(pin.as_str())),
            Some(ScriptedEntry::Cancel) => Ok(PinResponse::Cancelled),
            None => Err(PinpadError::InteractionFailed(
                "no scripted PIN entry left".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_list() {
        let surface = ScriptedSurface::from_list("0000, c ,1234");
        assert_eq!(surface.remaining(), 3);
        assert_eq!(
            *surface.entries.lock(),
            VecDeque::from(vec![
                ScriptedEntry::Pin(Zeroizing::new("0000".to_string())),
                ScriptedEntry::Cancel,
                ScriptedEntry::Pin(Zeroizing::new("1234".to_string())),
            ])
        );
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let surface = ScriptedSurface::from_list("");
        let request = PinRequest {
            prompt_code: 1,
            amount: "2.00".to_string(),
        };
        let result = surface.collect_pin(&request).await;
        assert!(matches!(result, Err(PinpadError::InteractionFailed(_))));
        assert_eq!(surface.requests(), vec![request]);
    }
}

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A captured PIN.
///
/// Not `Clone`: the value is moved from the surface to the worker and on
/// into the single engine call it serves. The buffer is zeroized on drop and
/// `Debug` never prints the digits.
pub struct Pin(Zeroizing<String>);

impl Pin {
    pub fn new(digits: impl Into<String>) -> Self {
        Self(Zeroizing::new(digits.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when the PIN is made only of ASCII digits.
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin(<{} digits>)", self.0.len())
    }
}

impl Zeroize for Pin {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl ZeroizeOnDrop for Pin {}

/// Sent from the worker to the interaction surface when the engine asks for
/// a PIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRequest {
    /// Opaque code supplied by the engine with its PIN demand.
    pub prompt_code: i32,
    /// Amount to show the operator.
    pub amount: String,
}

/// The surface's answer to one [`PinRequest`].
#[derive(Debug)]
pub enum PinResponse {
    Pin(Pin),
    Cancelled,
}

impl PinResponse {
    pub fn pin(digits: impl Into<String>) -> Self {
        Self::Pin(Pin::new(digits))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

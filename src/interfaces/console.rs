use crate::domain::pin::{Pin, PinRequest, PinResponse};
use crate::domain::ports::InteractionSurface;
use crate::error::{PinpadError, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

/// Line-oriented PIN entry.
///
/// Prompts on `output` and reads one line per try from `input`. A blank line
/// or `c` cancels; anything that is not all digits is asked for again.
pub struct ConsoleSurface<R, W> {
    io: Mutex<(Lines<R>, W)>,
}

impl ConsoleSurface<BufReader<tokio::io::Stdin>, tokio::io::Stderr> {
    /// Reads from stdin and prompts on stderr, leaving stdout to the results.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stderr())
    }
}

impl<R, W> ConsoleSurface<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input.lines(), output)),
        }
    }
}

#[async_trait]
impl<R, W> InteractionSurface for ConsoleSurface<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn collect_pin(&self, request: &PinRequest) -> Result<PinResponse> {
        let mut io = self.io.lock().await;
        let (lines, output) = &mut *io;

        let mut prompt = format!(
            "Amount {} [code {}] - enter PIN (blank to cancel): ",
            request.amount, request.prompt_code
        );
        loop {
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await?.map(Zeroizing::new) else {
                return Err(PinpadError::InteractionFailed(
                    "input closed during PIN entry".to_string(),
                ));
            };

            let entry = line.trim();
            if entry.is_empty() || entry.eq_ignore_ascii_case("c") {
                return Ok(PinResponse::Cancelled);
            }
            let pin = Pin::new(entry);
            if pin.is_numeric() {
                return Ok(PinResponse::Pin(pin));
            }
            prompt = "PIN must contain digits only, try again: ".to_string();
        }
    }
}

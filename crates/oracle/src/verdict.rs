//! Verdict extraction: live brick count vs. declared total

use crate::input::Injector;
use crate::reader::OutputReader;
use holecheck_common::save_file::read_declared_total;
use holecheck_common::{Error, OracleConfig, Outcome, Result};
use std::path::Path;
use tracing::info;

/// Parse a console reply consisting of nothing but a count.
///
/// `None` means the line is not a reply at all. A digits-only line that does
/// not fit a count is a reply the game got wrong.
pub fn parse_count_reply(line: &str) -> Option<Result<u64>> {
    let line = line.trim_end();
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(
        line.parse::<u64>()
            .map_err(|e| Error::InvalidReply(format!("brick count {:?}: {}", line, e))),
    )
}

pub struct VerdictExtractor<'a> {
    config: &'a OracleConfig,
}

impl<'a> VerdictExtractor<'a> {
    pub fn new(config: &'a OracleConfig) -> Self {
        Self { config }
    }

    /// Ask the running game how many bricks it holds
    pub async fn live_count(
        &self,
        output: &mut OutputReader,
        input: &mut Injector,
    ) -> Result<u64> {
        input.focus_target().await?;
        input.submit(&self.config.commands.count_query).await?;

        let count = output
            .wait_map("numeric brick count reply", parse_count_reply)
            .await??;
        info!("Game reports {} bricks", count);
        Ok(count)
    }

    /// Brick total the save file declares
    pub fn declared_total(&self, artifact: &Path) -> Result<u64> {
        let total = read_declared_total(artifact, &self.config.artifact)?;
        info!("Save declares {} bricks", total);
        Ok(total)
    }

    pub fn verdict(live_count: u64, declared_total: u64) -> Outcome {
        Outcome::from_counts(live_count, declared_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputBackend, InputEvent};
    use crate::layout::FixedLayout;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Discard;

    #[async_trait]
    impl InputBackend for Discard {
        async fn send(&mut self, _event: &InputEvent) -> Result<()> {
            Ok(())
        }
    }

    fn injector() -> Injector {
        Injector::new(
            Box::new(Discard),
            Box::new(FixedLayout::default()),
            Duration::ZERO,
            CancellationToken::new(),
        )
    }

    fn output(script: &str) -> OutputReader {
        OutputReader::new(
            Cursor::new(script.as_bytes().to_vec()),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    fn reply(line: &str) -> Option<u64> {
        parse_count_reply(line).map(|r| r.unwrap())
    }

    #[test]
    fn test_count_reply_shapes() {
        assert_eq!(reply("1200"), Some(1200));
        assert_eq!(reply("1200\r"), Some(1200));
        assert_eq!(reply("0"), Some(0));
        assert_eq!(reply(""), None);
        assert_eq!(reply(" 12"), None);
        assert_eq!(reply("-5"), None);
        assert_eq!(reply("12 bricks"), None);
    }

    #[tokio::test]
    async fn test_oversized_count_fails_instead_of_stalling() {
        let config = OracleConfig::default();
        let mut out = output("noise\n99999999999999999999999\n1200\n");

        let err = VerdictExtractor::new(&config)
            .live_count(&mut out, &mut injector())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidReply(_)));
    }

    #[tokio::test]
    async fn test_skips_noise_before_reply() {
        let config = OracleConfig::default();
        let mut out = output("noise\nalso noise\nLoading Add-On: Brick_Large_Cubes\n1200\n1300\n");

        let count = VerdictExtractor::new(&config)
            .live_count(&mut out, &mut injector())
            .await
            .unwrap();
        assert_eq!(count, 1200);
    }

    #[tokio::test]
    async fn test_no_reply_before_exit() {
        let config = OracleConfig::default();
        let mut out = output("noise\n");

        let err = VerdictExtractor::new(&config)
            .live_count(&mut out, &mut injector())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StreamClosed { .. }));
    }

    #[test]
    fn test_verdict_cases() {
        assert!(VerdictExtractor::verdict(900, 1000).is_defect());
        assert!(!VerdictExtractor::verdict(1000, 1000).is_defect());
        assert!(!VerdictExtractor::verdict(1000, 900).is_defect());
    }
}

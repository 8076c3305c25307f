//! Subtitle compiler: transcript segments to SRT and ASS captions.

pub mod ass;
pub mod compiler;
pub mod srt;
pub mod types;

pub use compiler::compile;
pub use types::{CaptionCue, CaptionFiles, CaptionStyle, CompilerPolicy, DecodedCue};

use std::path::Path;

/// Write both serializations of `cues` into `dir` as `{stem}.srt` and
/// `{stem}.ass`.
pub async fn write_caption_files(
    cues: &[CaptionCue],
    style: &CaptionStyle,
    dir: &Path,
    stem: &str,
) -> Result<CaptionFiles, std::io::Error> {
    tokio::fs::create_dir_all(dir).await?;

    let files = CaptionFiles {
        srt: dir.join(format!("{}.srt", stem)),
        ass: dir.join(format!("{}.ass", stem)),
    };
    tokio::fs::write(&files.srt, srt::write_srt(cues)).await?;
    tokio::fs::write(&files.ass, ass::write_ass(cues, style)).await?;

    tracing::debug!(cues = cues.len(), srt = ?files.srt, ass = ?files.ass, "Caption files written");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::{TimedWord, TranscriptSegment};
    use tempfile::tempdir;

    fn transcript() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment::new(0, 2400, "Did you know octopuses have three hearts?").with_words(vec![
                TimedWord::new("Did", 0, 180),
                TimedWord::new("you", 180, 320),
                TimedWord::new("know", 320, 600),
                TimedWord::new("octopuses", 600, 1300),
                TimedWord::new("have", 1300, 1600),
                TimedWord::new("three", 1600, 1950),
                TimedWord::new("hearts?", 1950, 2400),
            ]),
            TranscriptSegment::new(2380, 2700, "Wow."),
            TranscriptSegment::new(2900, 6100, "Two pump blood to the gills and one pumps it to the rest of the body."),
            TranscriptSegment::new(6100, 6133, "Ok"),
        ]
    }

    #[tokio::test]
    async fn test_both_serializations_decode_to_identical_timing() {
        let cues = compile(&transcript(), &CompilerPolicy::default()).unwrap();
        let dir = tempdir().unwrap();

        let files = write_caption_files(&cues, &CaptionStyle::default(), dir.path(), "Facts_1")
            .await
            .unwrap();

        let srt = tokio::fs::read_to_string(&files.srt).await.unwrap();
        let ass = tokio::fs::read_to_string(&files.ass).await.unwrap();
        let from_srt = srt::parse_srt(&srt).unwrap();
        let from_ass = ass::parse_ass(&ass).unwrap();

        let expected: Vec<DecodedCue> = cues.iter().map(DecodedCue::from).collect();
        assert_eq!(from_srt, expected);
        assert_eq!(from_ass, expected);
        assert_eq!(files.srt, dir.path().join("Facts_1.srt"));
    }

    #[tokio::test]
    async fn test_backslash_sequences_decode_the_same() {
        let segments = vec![
            TranscriptSegment::new(0, 1200, "C:\\New folder"),
            TranscriptSegment::new(1200, 2600, "a\\hb and \\n {\\b1}bold"),
        ];
        let cues = compile(&segments, &CompilerPolicy::default()).unwrap();
        let dir = tempdir().unwrap();

        let files = write_caption_files(&cues, &CaptionStyle::default(), dir.path(), "captions")
            .await
            .unwrap();

        let srt = tokio::fs::read_to_string(&files.srt).await.unwrap();
        let ass = tokio::fs::read_to_string(&files.ass).await.unwrap();
        let from_srt = srt::parse_srt(&srt).unwrap();
        let from_ass = ass::parse_ass(&ass).unwrap();

        assert_eq!(from_srt, from_ass);
        assert!(from_ass.iter().all(|cue| !cue.text.contains('\\')));
        assert_eq!(from_ass[0].text, "C:New folder");
    }
}

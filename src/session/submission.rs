//! Submission wire format
//!
//! One unit per recorded problem. Binary payloads go through the
//! [`BinaryStore`]; the unit carries references to them.

use super::store::BinaryStore;
use crate::capture::FRAME_SEQUENCE_MIME;
use crate::recorder::{RecordingResult, Segment};
use serde::{Deserialize, Serialize};
use std::io;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRef {
    pub url: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUnit {
    pub problem_id: String,
    pub problem_index: usize,
    pub duration_seconds: f64,
    pub segments: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_reaction_seconds: Option<f64>,
    pub media: BlobRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub still_frame: Option<BlobRef>,
}

fn extension(mime_type: &str) -> &'static str {
    match mime_type {
        FRAME_SEQUENCE_MIME => "frames",
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}

pub fn media_filename(result: &RecordingResult) -> String {
    format!(
        "problem-{}-{}.{}",
        result.problem_index,
        result.id,
        extension(&result.media.mime_type)
    )
}

pub fn still_frame_filename(result: &RecordingResult) -> String {
    format!("problem-{}-{}-still.png", result.problem_index, result.id)
}

/// Upload one result's blobs and build its wire unit
pub async fn upload_result(
    store: &dyn BinaryStore,
    result: &RecordingResult,
) -> io::Result<SubmissionUnit> {
    let media_url = store
        .save(&result.media.bytes, &media_filename(result))
        .await?;

    let still_frame = match &result.still_frame {
        Some(still) => {
            let url = store.save(&still.png, &still_frame_filename(result)).await?;
            Some(BlobRef {
                url,
                mime_type: "image/png".to_string(),
                size_bytes: still.png.len(),
            })
        }
        None => None,
    };

    Ok(SubmissionUnit {
        problem_id: result.problem_id.clone(),
        problem_index: result.problem_index,
        duration_seconds: result.duration_seconds,
        segments: result.segments.clone(),
        first_reaction_seconds: result.first_reaction_seconds,
        media: BlobRef {
            url: media_url,
            mime_type: result.media.mime_type.clone(),
            size_bytes: result.media.size_bytes(),
        },
        still_frame,
    })
}

//! The two external-tool stages of a conversion.

use std::path::Path;

use crate::command::{ToolCommand, ToolOutput};
use crate::tools::ToolRegistry;

/// Decode `input` into raw mono signed 16-bit little-endian PCM at
/// `sample_rate` Hz, written headerless to `pcm`.
pub async fn transcode_to_pcm(
    tools: &ToolRegistry,
    input: &Path,
    pcm: &Path,
    sample_rate: u32,
) -> sc_core::Result<ToolOutput> {
    tracing::debug!("transcode {:?} -> {:?}", input, pcm);

    let mut cmd = ToolCommand::for_tool(tools.transcoder());
    cmd.args(["-y", "-i"]);
    cmd.arg(input);
    cmd.args(["-f", "s16le", "-acodec", "pcm_s16le"]);
    cmd.args(["-ar", &sample_rate.to_string()]);
    cmd.args(["-ac", "1"]);
    cmd.arg(pcm);
    cmd.execute().await
}

/// Encode headerless PCM into a SILK file. `mode_flag` is appended when
/// non-empty (e.g. `-tencent`).
pub async fn encode_to_silk(
    tools: &ToolRegistry,
    pcm: &Path,
    output: &Path,
    mode_flag: &str,
) -> sc_core::Result<ToolOutput> {
    tracing::debug!("encode {:?} -> {:?}", pcm, output);

    let mut cmd = ToolCommand::for_tool(tools.encoder());
    cmd.arg(pcm);
    cmd.arg(output);
    if !mode_flag.is_empty() {
        cmd.arg(mode_flag);
    }
    cmd.execute().await
}

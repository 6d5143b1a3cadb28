//! Incremental FLV demuxing for HTTP-FLV live streams.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

pub const HEADER_LEN: usize = 9;
const TAG_HEADER_LEN: usize = 11;
const PREVIOUS_TAG_SIZE_LEN: usize = 4;
const MAX_TAG_SIZE: usize = 8 * 1024 * 1024;
const AVC_CODEC_ID: u8 = 7;
const KEYFRAME_TYPE: u8 = 1;
const ANNEXB_START_CODE: [u8; 4] = [0, 0, 0, 1];
const ON_METADATA: &[u8] = b"onMetaData";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlvError {
    #[error("stream does not start with an FLV signature")]
    BadSignature,
    #[error("unsupported FLV version {0}")]
    UnsupportedVersion(u8),
    #[error("FLV header declares invalid data offset {0}")]
    InvalidDataOffset(u32),
    #[error("FLV tag of {0} bytes exceeds the size limit")]
    TagTooLarge(usize),
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("invalid AVC payload: {0}")]
    InvalidAvc(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvHeader {
    pub version: u8,
    pub has_audio: bool,
    pub has_video: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Audio,
    Video,
    Script,
    Other(u8),
}

impl TagKind {
    fn from_byte(byte: u8) -> Self {
        match byte & 0x1f {
            8 => Self::Audio,
            9 => Self::Video,
            18 => Self::Script,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlvTag {
    pub kind: TagKind,
    pub timestamp_ms: u32,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlvEvent {
    Header(FlvHeader),
    Tag(FlvTag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Skip(usize),
    PreviousTagSize,
    Tag,
}

#[derive(Debug)]
pub struct FlvDemuxer {
    buf: BytesMut,
    state: State,
}

impl Default for FlvDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl FlvDemuxer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(64 * 1024),
            state: State::Header,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next complete event, or `None` when more bytes are needed.
    pub fn next_event(&mut self) -> Result<Option<FlvEvent>, FlvError> {
        loop {
            match self.state {
                State::Header => {
                    if self.buf.len() < HEADER_LEN {
                        return Ok(None);
                    }
                    if &self.buf[..3] != b"FLV" {
                        return Err(FlvError::BadSignature);
                    }
                    let version = self.buf[3];
                    if version != 1 {
                        return Err(FlvError::UnsupportedVersion(version));
                    }
                    let flags = self.buf[4];
                    let data_offset =
                        u32::from_be_bytes([self.buf[5], self.buf[6], self.buf[7], self.buf[8]]);
                    let offset = usize::try_from(data_offset)
                        .ok()
                        .filter(|offset| *offset >= HEADER_LEN && *offset <= MAX_TAG_SIZE)
                        .ok_or(FlvError::InvalidDataOffset(data_offset))?;

                    self.buf.advance(HEADER_LEN);
                    self.state = State::Skip(offset - HEADER_LEN);
                    return Ok(Some(FlvEvent::Header(FlvHeader {
                        version,
                        has_audio: flags & 0x04 != 0,
                        has_video: flags & 0x01 != 0,
                    })));
                }
                State::Skip(0) => {
                    self.state = State::PreviousTagSize;
                }
                State::Skip(remaining) => {
                    let step = remaining.min(self.buf.len());
                    if step == 0 {
                        return Ok(None);
                    }
                    self.buf.advance(step);
                    self.state = State::Skip(remaining - step);
                }
                State::PreviousTagSize => {
                    if self.buf.len() < PREVIOUS_TAG_SIZE_LEN {
                        return Ok(None);
                    }
                    self.buf.advance(PREVIOUS_TAG_SIZE_LEN);
                    self.state = State::Tag;
                }
                State::Tag => {
                    if self.buf.len() < TAG_HEADER_LEN {
                        return Ok(None);
                    }
                    let kind = TagKind::from_byte(self.buf[0]);
                    let size = read_u24(&self.buf[1..4]) as usize;
                    if size > MAX_TAG_SIZE {
                        return Err(FlvError::TagTooLarge(size));
                    }
                    if self.buf.len() < TAG_HEADER_LEN + size {
                        return Ok(None);
                    }
                    let timestamp_ms = read_u24(&self.buf[4..7]) | (u32::from(self.buf[7]) << 24);

                    self.buf.advance(TAG_HEADER_LEN);
                    let data = self.buf.split_to(size).freeze();
                    self.state = State::PreviousTagSize;
                    return Ok(Some(FlvEvent::Tag(FlvTag {
                        kind,
                        timestamp_ms,
                        data,
                    })));
                }
            }
        }
    }
}

fn read_u24(bytes: &[u8]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

#[must_use]
pub fn is_on_metadata(script: &[u8]) -> bool {
    if script.len() < 3 || script[0] != 0x02 {
        return false;
    }
    let len = usize::from(u16::from_be_bytes([script[1], script[2]]));
    script.get(3..3 + len) == Some(ON_METADATA)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPacket<'a> {
    AvcSequenceHeader(&'a [u8]),
    AvcNalus {
        keyframe: bool,
        composition_time_ms: i32,
        data: &'a [u8],
    },
    AvcEndOfSequence,
    Unsupported {
        codec_id: u8,
    },
}

pub fn parse_video_packet(data: &[u8]) -> Result<VideoPacket<'_>, FlvError> {
    let (&first, rest) = data
        .split_first()
        .ok_or(FlvError::Truncated("video tag"))?;
    let frame_type = first >> 4;
    let codec_id = first & 0x0f;
    if codec_id != AVC_CODEC_ID {
        return Ok(VideoPacket::Unsupported { codec_id });
    }
    if rest.len() < 4 {
        return Err(FlvError::Truncated("AVC packet header"));
    }

    let raw_cts = read_u24(&rest[1..4]);
    // Composition time is a signed 24-bit value.
    let composition_time_ms = ((raw_cts << 8) as i32) >> 8;
    let payload = &rest[4..];

    match rest[0] {
        0 => Ok(VideoPacket::AvcSequenceHeader(payload)),
        1 => Ok(VideoPacket::AvcNalus {
            keyframe: frame_type == KEYFRAME_TYPE,
            composition_time_ms,
            data: payload,
        }),
        2 => Ok(VideoPacket::AvcEndOfSequence),
        _ => Err(FlvError::InvalidAvc("unknown AVC packet type")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcDecoderConfig {
    pub nal_length_size: usize,
    /// SPS and PPS units, each prefixed with an Annex-B start code.
    pub parameter_sets: Vec<u8>,
}

pub fn parse_avc_decoder_config(record: &[u8]) -> Result<AvcDecoderConfig, FlvError> {
    if record.len() < 7 {
        return Err(FlvError::InvalidAvc("decoder config too short"));
    }
    if record[0] != 1 {
        return Err(FlvError::InvalidAvc("unsupported decoder config version"));
    }

    let nal_length_size = usize::from(record[4] & 0x03) + 1;
    if nal_length_size == 3 {
        return Err(FlvError::InvalidAvc("3-byte NAL lengths are not allowed"));
    }

    let mut parameter_sets = Vec::with_capacity(record.len() + 16);
    let mut cursor = 5_usize;

    let sps_count = usize::from(record[cursor] & 0x1f);
    cursor += 1;
    cursor = copy_parameter_sets(record, cursor, sps_count, &mut parameter_sets)?;

    let pps_count = usize::from(
        *record
            .get(cursor)
            .ok_or(FlvError::InvalidAvc("PPS count missing"))?,
    );
    cursor += 1;
    copy_parameter_sets(record, cursor, pps_count, &mut parameter_sets)?;

    Ok(AvcDecoderConfig {
        nal_length_size,
        parameter_sets,
    })
}

fn copy_parameter_sets(
    record: &[u8],
    mut cursor: usize,
    count: usize,
    output: &mut Vec<u8>,
) -> Result<usize, FlvError> {
    for _ in 0..count {
        let len_bytes = record
            .get(cursor..cursor + 2)
            .ok_or(FlvError::InvalidAvc("parameter set length missing"))?;
        let len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
        cursor += 2;
        let unit = record
            .get(cursor..cursor + len)
            .ok_or(FlvError::InvalidAvc("parameter set exceeds record"))?;
        output.extend_from_slice(&ANNEXB_START_CODE);
        output.extend_from_slice(unit);
        cursor += len;
    }
    Ok(cursor)
}

/// Rewrites length-prefixed NAL units into `output` with start codes.
pub fn avcc_to_annexb(
    input: &[u8],
    nal_length_size: usize,
    output: &mut Vec<u8>,
) -> Result<(), FlvError> {
    output.clear();
    if !(1..=4).contains(&nal_length_size) {
        return Err(FlvError::InvalidAvc("NAL length size out of range"));
    }

    let mut cursor = 0_usize;
    while cursor + nal_length_size <= input.len() {
        let nal_len = input[cursor..cursor + nal_length_size]
            .iter()
            .fold(0_usize, |acc, byte| (acc << 8) | usize::from(*byte));
        cursor += nal_length_size;

        let unit = input
            .get(cursor..cursor + nal_len)
            .ok_or(FlvError::InvalidAvc("NAL length exceeds payload"))?;
        output.extend_from_slice(&ANNEXB_START_CODE);
        output.extend_from_slice(unit);
        cursor += nal_len;
    }

    if cursor != input.len() {
        return Err(FlvError::InvalidAvc("trailing bytes after last NAL unit"));
    }
    Ok(())
}

//! JPEG marker-segment walk and APP1 removal.

use super::reader::ByteReader;
use super::{ContainerFormat, ParseError};

pub const SOI: u16 = 0xFFD8;
pub const EOI: u16 = 0xFFD9;
pub const SOS: u16 = 0xFFDA;
/// APP1 carries EXIF (and XMP) payloads.
pub const APP1: u16 = 0xFFE1;

/// What a stretch of the JPEG byte stream is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// The leading `FFD8`.
    StartOfImage,
    /// Marker followed by a big-endian length field and body.
    Marker(u16),
    /// Marker without a length field (`TEM`, `RSTn`, `EOI`).
    Standalone(u16),
    /// A single `FF` fill byte preceding a marker.
    Fill,
    /// Everything after marker parsing ends (scan data, trailer), copied verbatim.
    Remainder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub offset: usize,
    pub kind: SegmentKind,
    /// Raw bytes including the marker itself.
    pub bytes: &'a [u8],
}

impl Segment<'_> {
    pub fn marker(&self) -> Option<u16> {
        match self.kind {
            SegmentKind::StartOfImage => Some(SOI),
            SegmentKind::Marker(m) | SegmentKind::Standalone(m) => Some(m),
            SegmentKind::Fill | SegmentKind::Remainder => None,
        }
    }

    pub fn is_app1(&self) -> bool {
        self.kind == SegmentKind::Marker(APP1)
    }

    /// Short mnemonic for display.
    pub fn name(&self) -> String {
        match (self.marker(), self.kind) {
            (Some(marker), _) => marker_name(marker),
            (None, SegmentKind::Fill) => "fill".to_string(),
            (None, _) => "data".to_string(),
        }
    }
}

pub fn marker_name(marker: u16) -> String {
    match marker {
        SOI => "SOI".to_string(),
        EOI => "EOI".to_string(),
        SOS => "SOS".to_string(),
        0xFFC4 => "DHT".to_string(),
        0xFFDB => "DQT".to_string(),
        0xFFDD => "DRI".to_string(),
        0xFFFE => "COM".to_string(),
        0xFF01 => "TEM".to_string(),
        0xFFC0..=0xFFCF => format!("SOF{}", marker - 0xFFC0),
        0xFFD0..=0xFFD7 => format!("RST{}", marker - 0xFFD0),
        0xFFE0..=0xFFEF => format!("APP{}", marker - 0xFFE0),
        other => format!("{:04X}", other),
    }
}

pub fn is_jpeg(data: &[u8]) -> bool {
    ByteReader::new(data).read_u16_be(0) == Ok(SOI)
}

/// Split a JPEG into its marker segments.
///
/// Marker parsing stops at the first byte that is not `FF`, after the SOS
/// segment or after EOI; the rest of the buffer becomes one
/// [`SegmentKind::Remainder`]. Length fields under 2 or running past the end
/// of the buffer are errors.
pub fn segments(data: &[u8]) -> Result<Vec<Segment<'_>>, ParseError> {
    let reader = ByteReader::new(data);
    if reader.read_u16_be(0).ok() != Some(SOI) {
        return Err(ParseError::BadSignature(ContainerFormat::Jpeg));
    }

    let mut out = vec![Segment {
        offset: 0,
        kind: SegmentKind::StartOfImage,
        bytes: reader.slice(0, 2)?,
    }];
    let mut offset = 2;

    while offset < reader.len() {
        if reader.read_u8(offset)? != 0xFF {
            break;
        }

        let marker = reader.read_u16_be(offset)?;
        match marker {
            0xFFFF => {
                out.push(Segment {
                    offset,
                    kind: SegmentKind::Fill,
                    bytes: reader.slice(offset, 1)?,
                });
                offset += 1;
            }
            0xFF01 | 0xFFD0..=0xFFD9 => {
                out.push(Segment {
                    offset,
                    kind: SegmentKind::Standalone(marker),
                    bytes: reader.slice(offset, 2)?,
                });
                offset += 2;
                if marker == EOI {
                    break;
                }
            }
            _ => {
                let length = usize::from(reader.read_u16_be(offset + 2)?);
                if length < 2 {
                    return Err(ParseError::InvalidSegmentLength { offset, length });
                }
                let bytes = reader.slice(offset, 2 + length)?;
                out.push(Segment {
                    offset,
                    kind: SegmentKind::Marker(marker),
                    bytes,
                });
                offset += bytes.len();
                if marker == SOS {
                    break;
                }
            }
        }
    }

    let rest = reader.rest(offset)?;
    if !rest.is_empty() {
        out.push(Segment {
            offset,
            kind: SegmentKind::Remainder,
            bytes: rest,
        });
    }

    Ok(out)
}

/// Rebuild the JPEG without its APP1 segments.
pub fn strip(data: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::with_capacity(data.len());
    for segment in segments(data)? {
        if segment.is_app1() {
            tracing::trace!(
                offset = segment.offset,
                size_bytes = segment.bytes.len(),
                "Dropping APP1 segment"
            );
            continue;
        }
        out.extend_from_slice(segment.bytes);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    fn segment(marker: u8, body: &[u8]) -> Vec<u8> {
        let len = (body.len() + 2) as u16;
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn exif_app1() -> Vec<u8> {
        let mut body = b"Exif\0\0".to_vec();
        body.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A]);
        body.resize(48, 0xAB);
        segment(0xE1, &body)
    }

    fn sample_jpeg() -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
        let app0 = segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
        let dqt = segment(0xDB, &[0u8; 65]);
        let mut sos = segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
        sos.extend_from_slice(&[0x12, 0x34, 0xFF, 0x00, 0x56, 0xFF, 0xD9]);
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&app0);
        jpeg.extend_from_slice(&exif_app1());
        jpeg.extend_from_slice(&dqt);
        jpeg.extend_from_slice(&sos);
        (jpeg, app0, dqt, sos)
    }

    #[test]
    fn test_detects_signature() {
        assert!(is_jpeg(&[0xFF, 0xD8]));
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0xFF]));
        assert!(!is_jpeg(&[0xD8, 0xFF]));
        assert!(!is_jpeg(&[]));
    }

    #[test]
    fn test_strip_removes_app1_and_keeps_other_segments() {
        let (jpeg, app0, dqt, sos) = sample_jpeg();

        let stripped = strip(&jpeg).unwrap();

        let mut expected = vec![0xFF, 0xD8];
        expected.extend_from_slice(&app0);
        expected.extend_from_slice(&dqt);
        expected.extend_from_slice(&sos);
        assert_eq!(stripped, expected);
        assert_eq!(jpeg.len() - stripped.len(), exif_app1().len());
    }

    #[test]
    fn test_strip_removes_every_app1() {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&exif_app1());
        jpeg.extend_from_slice(&segment(0xE1, b"http://ns.adobe.com/xap/1.0/\0<x/>"));
        jpeg.extend_from_slice(&segment(0xFE, b"comment"));

        let stripped = strip(&jpeg).unwrap();
        let kinds: Vec<_> = segments(&stripped).unwrap().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SegmentKind::StartOfImage, SegmentKind::Marker(0xFFFE)]
        );
    }

    #[test]
    fn test_scan_data_is_not_interpreted() {
        // FF 00 stuffing and an embedded FF E1 inside the scan must survive untouched.
        let mut jpeg = vec![0xFF, 0xD8];
        let mut sos = segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
        sos.extend_from_slice(&[0xFF, 0x00, 0xFF, 0xE1, 0x00, 0x02, 0xFF, 0xD9]);
        jpeg.extend_from_slice(&sos);

        assert_eq!(strip(&jpeg).unwrap(), jpeg);
    }

    #[test]
    fn test_non_marker_byte_stops_parsing() {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&segment(0xDB, &[1, 2, 3]));
        jpeg.extend_from_slice(&[0x00, 0xFF, 0xE1, 0x00, 0x02]);

        let segs = segments(&jpeg).unwrap();
        assert_eq!(segs.last().unwrap().kind, SegmentKind::Remainder);
        assert_eq!(segs.last().unwrap().bytes, &[0x00, 0xFF, 0xE1, 0x00, 0x02]);
        assert_eq!(strip(&jpeg).unwrap(), jpeg);
    }

    #[test]
    fn test_standalone_markers_and_trailer() {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&exif_app1());
        jpeg.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xD9, 0xDE, 0xAD]);

        let segs = segments(&jpeg).unwrap();
        let kinds: Vec<_> = segs.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::StartOfImage,
                SegmentKind::Marker(APP1),
                SegmentKind::Fill,
                SegmentKind::Standalone(EOI),
                SegmentKind::Remainder,
            ]
        );
        assert_eq!(
            strip(&jpeg).unwrap(),
            vec![0xFF, 0xD8, 0xFF, 0xFF, 0xD9, 0xDE, 0xAD]
        );
    }

    #[test]
    fn test_app1_length_past_end_is_an_error() {
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x10, 0x00];
        jpeg.extend_from_slice(&[0u8; 16]);
        assert!(matches!(strip(&jpeg), Err(ParseError::OutOfBounds { .. })));
    }

    #[test]
    fn test_length_below_two_is_an_error() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x01, 0x00];
        assert_eq!(
            strip(&jpeg),
            Err(ParseError::InvalidSegmentLength {
                offset: 2,
                length: 1
            })
        );
    }

    #[test]
    fn test_missing_length_field_is_an_error() {
        assert!(strip(&[0xFF, 0xD8, 0xFF, 0xE1]).is_err());
        assert!(strip(&[0xFF, 0xD8, 0xFF, 0xE1, 0x00]).is_err());
        assert!(strip(&[0xFF, 0xD8, 0xFF]).is_err());
    }

    #[test]
    fn test_soi_only() {
        assert_eq!(strip(&[0xFF, 0xD8]).unwrap(), vec![0xFF, 0xD8]);
    }

    #[test]
    fn test_every_truncation_is_handled_without_panic() {
        let (jpeg, ..) = sample_jpeg();
        for end in 2..jpeg.len() {
            let truncated = &jpeg[..end];
            if let Ok(out) = strip(truncated) {
                assert!(out.len() <= truncated.len());
            }
        }
    }

    #[test]
    fn test_segment_names() {
        let (jpeg, ..) = sample_jpeg();
        let names: Vec<_> = segments(&jpeg).unwrap().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["SOI", "APP0", "APP1", "DQT", "SOS", "data"]);

        let fill = [0xFF, 0xD8, 0xFF, 0xFF, 0xD9];
        let names: Vec<_> = segments(&fill).unwrap().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["SOI", "fill", "EOI"]);
    }

    #[test]
    fn test_marker_names() {
        assert_eq!(marker_name(0xFFE1), "APP1");
        assert_eq!(marker_name(0xFFC0), "SOF0");
        assert_eq!(marker_name(0xFFD3), "RST3");
        assert_eq!(marker_name(0xFFDB), "DQT");
        assert_eq!(marker_name(0xFF42), "FF42");
    }

    const LENGTH_MARKERS: [u8; 9] = [0xC0, 0xC4, 0xDB, 0xDD, 0xE0, 0xE1, 0xE2, 0xED, 0xFE];

    fn arb_segment() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![
            4 => (prop::sample::select(LENGTH_MARKERS.to_vec()), vec(any::<u8>(), 0..64))
                .prop_map(|(marker, body)| segment(marker, &body)),
            1 => (0xD0u8..=0xD7).prop_map(|marker| vec![0xFF, marker]),
        ]
    }

    proptest! {
        #[test]
        fn test_strip_drops_exactly_the_app1_segments(
            parts in vec(arb_segment(), 0..12),
            scan in vec(any::<u8>(), 0..64),
        ) {
            let mut sos = segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
            sos.extend_from_slice(&scan);

            let mut input = vec![0xFF, 0xD8];
            let mut expected = vec![0xFF, 0xD8];
            for part in &parts {
                input.extend_from_slice(part);
                if part[1] != 0xE1 {
                    expected.extend_from_slice(part);
                }
            }
            input.extend_from_slice(&sos);
            expected.extend_from_slice(&sos);

            let walked: Vec<u8> = segments(&input)
                .unwrap()
                .iter()
                .flat_map(|s| s.bytes.iter().copied())
                .collect();
            prop_assert_eq!(&walked, &input);

            let stripped = strip(&input).unwrap();
            prop_assert_eq!(&stripped, &expected);
            prop_assert!(segments(&stripped).unwrap().iter().all(|s| !s.is_app1()));
        }
    }
}

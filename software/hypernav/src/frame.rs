//! An assembled spectrum with its telemetry header.

use hypernav_shared::{ByteStruct, ByteStructLen, FrameHeader};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AcquiredFrame {
    pub header: FrameHeader,
    pub pixels: Vec<u16>,
}

impl AcquiredFrame {
    /// Empty frame with room for `pixel_count` pixels
    pub fn with_capacity(pixel_count: usize) -> Self {
        Self {
            header: FrameHeader::default(),
            pixels: Vec::with_capacity(pixel_count),
        }
    }

    /// Encoded length: header followed by little-endian pixels
    pub fn byte_len(&self) -> usize {
        FrameHeader::BYTE_LEN + 2 * self.pixels.len()
    }

    /// Encode into `buf`, replacing its contents
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.resize(FrameHeader::BYTE_LEN, 0);
        self.header.write_bytes(&mut buf[..]);
        for p in &self.pixels {
            buf.extend_from_slice(&p.to_le_bytes());
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        self.write_bytes(&mut buf);
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < FrameHeader::BYTE_LEN {
            return Err(format!(
                "Frame record of {} bytes is shorter than its {} byte header",
                bytes.len(),
                FrameHeader::BYTE_LEN
            ));
        }
        let (head, body) = bytes.split_at(FrameHeader::BYTE_LEN);
        let header = FrameHeader::read_bytes(head);

        let n = header.pixel_count as usize;
        if body.len() != 2 * n {
            return Err(format!(
                "Frame record declares {n} pixels but carries {} payload bytes",
                body.len()
            ));
        }
        let pixels = body
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();

        Ok(Self { header, pixels })
    }
}

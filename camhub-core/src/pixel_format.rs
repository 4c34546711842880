use std::fmt::{self, Display};
use std::str::FromStr;

/// 四字符代码 (Four Character Code)，视频工业标准
///
/// 对未压缩的 RGB 格式，驱动报告的是 `BI_RGB` (数值 0)，这里用 [`FourCC::RGB`] 表示。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct FourCC(pub u32);

impl FourCC {
    /// 从 ASCII 字符创建 FourCC
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self((a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24))
    }

    /// 驱动报告的原始值 (biCompression)
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::RGB {
            return f.write_str("RGB");
        }
        let bytes = self.0.to_le_bytes();
        let text: String = bytes
            .iter()
            .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
            .collect();
        f.write_str(text.trim_end())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}

impl FromStr for FourCC {
    type Err = String;

    /// 解析 `Display` 的输出；不足四个字符时以空格补齐
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "RGB" {
            return Ok(Self::RGB);
        }
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 || !s.is_ascii() {
            return Err(format!("invalid FourCC: {s:?}"));
        }
        let mut padded = [b' '; 4];
        padded[..bytes.len()].copy_from_slice(bytes);
        Ok(Self::new(padded[0], padded[1], padded[2], padded[3]))
    }
}

/// 常用像素格式定义
impl FourCC {
    /// BI_RGB - 未压缩 RGB (位深由 color depth 决定)
    pub const RGB: Self = Self(0);

    // --- YUV Formats ---
    /// YUY2 4:2:2 - USB 摄像头最常用的未压缩格式
    pub const YUY2: Self = Self::new(b'Y', b'U', b'Y', b'2');
    /// UYVY 4:2:2
    pub const UYVY: Self = Self::new(b'U', b'Y', b'V', b'Y');
    /// NV12 4:2:0
    pub const NV12: Self = Self::new(b'N', b'V', b'1', b'2');
    /// YV12 4:2:0 (Planar)
    pub const YV12: Self = Self::new(b'Y', b'V', b'1', b'2');
    /// I420 4:2:0 (Planar)
    pub const I420: Self = Self::new(b'I', b'4', b'2', b'0');

    // --- Compressed Formats ---
    /// Motion-JPEG - 用于节省 USB 带宽
    pub const MJPG: Self = Self::new(b'M', b'J', b'P', b'G');
    /// H.264
    pub const H264: Self = Self::new(b'H', b'2', b'6', b'4');
}

/// 交付给帧回调的数据格式
///
/// 设备能直接提供 JPEG 时原样交付，否则由管线转换为 BGR24。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleFormat {
    /// 压缩的 JPEG 帧 (来自 MJPG 流)
    Jpeg,
    /// 未压缩 24 位 B-G-R
    Bgr24,
}

impl SampleFormat {
    /// 根据设备协商出的编码选择交付格式
    pub fn for_encoding(fourcc: FourCC) -> Self {
        if fourcc == FourCC::MJPG {
            Self::Jpeg
        } else {
            Self::Bgr24
        }
    }

    /// 判断是否为压缩格式
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// 未压缩格式的每像素字节数
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::Jpeg => None,
            Self::Bgr24 => Some(3),
        }
    }
}

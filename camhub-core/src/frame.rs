use crate::pixel_format::SampleFormat;

/// 交付给帧回调的一帧
///
/// `data` 借用自管线的采样缓冲区，回调返回后即失效；需要保留时必须拷贝。
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// 原始图像数据切片 (JPEG 字节流或 BGR24 像素)
    pub data: &'a [u8],

    /// 协商后的图像宽度 (Pixels)
    pub width: u32,

    /// 协商后的图像高度 (Pixels)
    pub height: u32,

    pub format: SampleFormat,

    /// 未压缩帧是否自底向上存储 (平台报告正高度的 DIB)
    pub bottom_up: bool,

    /// 会话内的帧序号，从 1 开始
    pub sequence: u64,

    /// 平台提供的采样时间 (秒)
    pub sample_time: f64,
}

impl<'a> Frame<'a> {
    pub fn is_compressed(&self) -> bool {
        self.format.is_compressed()
    }

    /// BGR24 帧的像素视图；压缩帧或长度不匹配时返回 None
    pub fn bgr_pixels(&self) -> Option<&'a [[u8; 3]]> {
        if self.format != SampleFormat::Bgr24 || self.data.len() % 3 != 0 {
            return None;
        }
        Some(bytemuck::cast_slice(self.data))
    }

    /// 拷贝为自有数据
    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            data: self.data.to_vec(),
            width: self.width,
            height: self.height,
            format: self.format,
            bottom_up: self.bottom_up,
            sequence: self.sequence,
            sample_time: self.sample_time,
        }
    }
}

/// 拷贝出来的帧，可以跨线程保存
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: SampleFormat,
    pub bottom_up: bool,
    pub sequence: u64,
    pub sample_time: f64,
}

impl OwnedFrame {
    pub fn as_frame(&self) -> Frame<'_> {
        Frame {
            data: &self.data,
            width: self.width,
            height: self.height,
            format: self.format,
            bottom_up: self.bottom_up,
            sequence: self.sequence,
            sample_time: self.sample_time,
        }
    }
}

/// 调用方提供的帧处理器
///
/// 在管线的交付线程上同步调用，必须在返回前用完缓冲区。
pub trait FrameHandler: Send + Sync {
    fn on_frame(&self, frame: Frame<'_>);
}

impl<F> FrameHandler for F
where
    F: Fn(Frame<'_>) + Send + Sync,
{
    fn on_frame(&self, frame: Frame<'_>) {
        self(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &[u8], format: SampleFormat) -> Frame<'_> {
        Frame {
            data,
            width: 2,
            height: 1,
            format,
            bottom_up: false,
            sequence: 1,
            sample_time: 0.0,
        }
    }

    #[test]
    fn bgr_view_only_for_raw_frames() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let raw = frame(&data, SampleFormat::Bgr24);
        assert_eq!(raw.bgr_pixels(), Some(&[[1, 2, 3], [4, 5, 6]][..]));

        let jpeg = frame(&data, SampleFormat::Jpeg);
        assert!(jpeg.bgr_pixels().is_none());

        let ragged = frame(&data[..5], SampleFormat::Bgr24);
        assert!(ragged.bgr_pixels().is_none());
    }

    #[test]
    fn owned_copy_preserves_metadata() {
        let data = [9u8; 6];
        let owned = frame(&data, SampleFormat::Bgr24).to_owned_frame();
        let view = owned.as_frame();
        assert_eq!(view.data, &data);
        assert_eq!(view.width, 2);
        assert_eq!(view.sequence, 1);
    }
}

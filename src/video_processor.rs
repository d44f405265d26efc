use ffmpeg_next as ffmpeg;
use ffmpeg::format::context::Input;
use ffmpeg::software::scaling;
use image::{DynamicImage, RgbImage};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AnalyzeError, Result};
use crate::metadata::VideoMetadata;
use crate::reporting::{Reporter, TracingReporter};

/// 帧来源：提供视频信息和按时间戳读取的解码帧
pub trait FrameSource {
    fn metadata(&self) -> &VideoMetadata;

    /// 读取最接近 `timestamp`（秒）的一帧 RGB 图像
    fn frame_at(&mut self, timestamp: f64) -> Result<DynamicImage>;
}

/// 视频处理器，负责解码视频并提取帧
///
/// 持有 FFmpeg 的输入上下文、解码器和缩放器，`close` 或离开作用域时释放。
pub struct VideoProcessor {
    path: PathBuf,
    input: Input,
    decoder: ffmpeg::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    clock: FrameClock,
    metadata: VideoMetadata,
    /// 解码位置已离开流起点，下次顺序扫描前需要回到开头
    cursor_moved: bool,
    reporter: Arc<dyn Reporter>,
}

impl VideoProcessor {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_reporter(path, Arc::new(TracingReporter))
    }

    pub fn open_with_reporter(
        path: impl AsRef<Path>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnalyzeError::NotFound(path.to_path_buf()));
        }

        ffmpeg::init().map_err(|e| AnalyzeError::open(path, format!("初始化 FFmpeg 失败: {e}")))?;
        // 只保留 FFmpeg 自身的错误日志
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);

        let input = ffmpeg::format::input(path).map_err(|e| AnalyzeError::open(path, e))?;

        let (stream_index, clock, frame_count, decoder) = {
            let stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| AnalyzeError::open(path, "未找到视频流"))?;

            let time_base = rational_to_f64(stream.time_base()).unwrap_or(0.0);
            let fps = rational_to_f64(stream.avg_frame_rate())
                .or_else(|| rational_to_f64(stream.rate()))
                .unwrap_or(0.0);
            let start_pts = if stream.start_time() == ffmpeg::ffi::AV_NOPTS_VALUE {
                0
            } else {
                stream.start_time()
            };

            let has_stream_duration =
                stream.duration() > 0 && stream.duration() != ffmpeg::ffi::AV_NOPTS_VALUE;
            let stream_seconds = if has_stream_duration {
                stream.duration() as f64 * time_base
            } else if input.duration() > 0 {
                input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
            } else {
                0.0
            };
            let frame_count = estimate_frame_count(stream.frames(), stream_seconds, fps);

            let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| AnalyzeError::open(path, format!("无法创建解码器上下文: {e}")))?;
            let decoder = context
                .decoder()
                .video()
                .map_err(|e| AnalyzeError::open(path, format!("无法创建视频解码器: {e}")))?;

            let clock = FrameClock {
                time_base,
                start_pts,
                fps,
            };
            (stream.index(), clock, frame_count, decoder)
        };

        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| AnalyzeError::open(path, format!("无法创建缩放器: {e}")))?;

        let metadata =
            VideoMetadata::new(clock.fps, frame_count, decoder.width(), decoder.height());
        reporter.video_opened(path, &metadata);

        Ok(Self {
            path: path.to_path_buf(),
            input,
            decoder,
            scaler,
            stream_index,
            clock,
            metadata,
            cursor_moved: false,
            reporter,
        })
    }

    /// 获取视频信息
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// 读取 `timestamp` 处的帧，帧号为 `round(timestamp * fps)`，不超过最后一帧
    pub fn frame_at(&mut self, timestamp: f64) -> Result<DynamicImage> {
        let index = frame_index_within(timestamp, &self.metadata).ok_or_else(|| {
            AnalyzeError::frame_read(
                timestamp,
                format!("超出视频范围（时长 {:.3}s）", self.metadata.duration),
            )
        })?;

        self.seek_seconds(self.clock.seconds_of_index(index))
            .map_err(|e| AnalyzeError::frame_read(timestamp, format!("跳转失败: {e}")))?;

        let image = self
            .decode_until(index)
            .map_err(|e| AnalyzeError::frame_read(timestamp, format!("解码失败: {e}")))?;

        image
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| AnalyzeError::frame_read(timestamp, "跳转后未解码出任何帧"))
    }

    /// 从视频开头每隔 `stride` 帧取一帧，最多 `max_count` 帧
    pub fn sample_frames(
        &mut self,
        stride: u64,
        max_count: Option<usize>,
    ) -> Result<Vec<DynamicImage>> {
        let mut frames = Vec::new();
        if max_count == Some(0) {
            return Ok(frames);
        }

        self.scan_frames(stride, 1, |_, image| {
            frames.push(DynamicImage::ImageRgb8(image));
            if max_count.is_some_and(|max| frames.len() >= max) {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })?;

        debug!("📸 [视频读取] 采样帧数: {}", frames.len());
        Ok(frames)
    }

    /// 顺序解码整个视频流，把每隔 `stride` 帧的图像（按 `downscale` 整数倍缩小）交给 `visitor`
    ///
    /// 返回实际解码的帧数。`visitor` 返回 `Break` 时提前结束。
    pub fn scan_frames<F>(&mut self, stride: u64, downscale: u32, mut visitor: F) -> Result<u64>
    where
        F: FnMut(u64, RgbImage) -> Result<ControlFlow<()>>,
    {
        if stride == 0 {
            return Err(AnalyzeError::config("采样间隔必须大于 0"));
        }

        if self.cursor_moved {
            self.seek_seconds(0.0)
                .map_err(|e| AnalyzeError::frame_read(0.0, format!("无法回到视频开头: {e}")))?;
        }
        self.cursor_moved = true;

        let downscale = downscale.max(1);
        let mut resized;
        let scaler = if downscale > 1 {
            resized = scaling::Context::get(
                self.decoder.format(),
                self.decoder.width(),
                self.decoder.height(),
                ffmpeg::format::Pixel::RGB24,
                (self.decoder.width() / downscale).max(1),
                (self.decoder.height() / downscale).max(1),
                scaling::Flags::AREA,
            )
            .map_err(|e| AnalyzeError::frame_read(0.0, format!("无法创建缩放器: {e}")))?;
            &mut resized
        } else {
            &mut self.scaler
        };

        let mut state = ScanState {
            decoded: 0,
            stride,
            fps: self.clock.fps,
        };

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                self.reporter
                    .warning(&format!("[视频读取] 跳过无法解码的数据包: {e}"));
                continue;
            }
            if drain_frames(&mut self.decoder, scaler, &mut state, &mut visitor)?.is_break() {
                return Ok(state.decoded);
            }
        }

        // 处理解码器中剩余的帧
        if self.decoder.send_eof().is_ok() {
            drain_frames(&mut self.decoder, scaler, &mut state, &mut visitor)?;
        }

        Ok(state.decoded)
    }

    /// 释放解码器句柄
    pub fn close(self) {
        drop(self);
    }

    fn seek_seconds(&mut self, seconds: f64) -> std::result::Result<(), ffmpeg::Error> {
        let start = self.clock.start_pts as f64 * self.clock.time_base;
        let target = ((seconds + start) * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;
        // 向后查找最近的关键帧
        self.input.seek(target, ..=target)?;
        self.decoder.flush();
        self.cursor_moved = true;
        Ok(())
    }

    /// 从当前位置解码，直到遇到帧号不小于 `target_index` 的帧
    ///
    /// 容器记录的帧数偏大时，流在目标之前结束，此时返回最后解码出的一帧。
    fn decode_until(
        &mut self,
        target_index: u64,
    ) -> std::result::Result<Option<RgbImage>, ffmpeg::Error> {
        let clock = self.clock;
        let reached = |frame: &ffmpeg::frame::Video| {
            frame
                .timestamp()
                .map_or(true, |pts| clock.index_of(pts) >= target_index)
        };

        let mut decoded = ffmpeg::frame::Video::empty();
        let mut previous = ffmpeg::frame::Video::empty();
        let mut have_previous = false;

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if reached(&decoded) {
                    return convert_frame(&mut self.scaler, &decoded).map(Some);
                }
                std::mem::swap(&mut decoded, &mut previous);
                have_previous = true;
            }
        }

        self.decoder.send_eof()?;
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            if reached(&decoded) {
                return convert_frame(&mut self.scaler, &decoded).map(Some);
            }
            std::mem::swap(&mut decoded, &mut previous);
            have_previous = true;
        }

        if have_previous {
            convert_frame(&mut self.scaler, &previous).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl FrameSource for VideoProcessor {
    fn metadata(&self) -> &VideoMetadata {
        VideoProcessor::metadata(self)
    }

    fn frame_at(&mut self, timestamp: f64) -> Result<DynamicImage> {
        VideoProcessor::frame_at(self, timestamp)
    }
}

impl Drop for VideoProcessor {
    fn drop(&mut self) {
        debug!("🔚 [视频读取] 释放解码器: {}", self.path.display());
    }
}

/// 流时间戳与帧号之间的换算
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    /// 每个时间戳单位对应的秒数
    time_base: f64,
    start_pts: i64,
    fps: f64,
}

impl FrameClock {
    fn index_of(&self, pts: i64) -> u64 {
        let seconds = (pts - self.start_pts) as f64 * self.time_base;
        (seconds * self.fps).round().max(0.0) as u64
    }

    fn seconds_of_index(&self, index: u64) -> f64 {
        if self.fps > 0.0 {
            index as f64 / self.fps
        } else {
            0.0
        }
    }
}

struct ScanState {
    decoded: u64,
    stride: u64,
    fps: f64,
}

fn drain_frames<F>(
    decoder: &mut ffmpeg::decoder::Video,
    scaler: &mut scaling::Context,
    state: &mut ScanState,
    visitor: &mut F,
) -> Result<ControlFlow<()>>
where
    F: FnMut(u64, RgbImage) -> Result<ControlFlow<()>>,
{
    let mut decoded = ffmpeg::frame::Video::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        let index = state.decoded;
        state.decoded += 1;
        if index % state.stride != 0 {
            continue;
        }

        let timestamp = if state.fps > 0.0 { index as f64 / state.fps } else { 0.0 };
        let image = convert_frame(scaler, &decoded)
            .map_err(|e| AnalyzeError::frame_read(timestamp, format!("转换帧失败: {e}")))?;

        if visitor(index, image)?.is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

/// 将解码帧转换为 RGB24 图像
fn convert_frame(
    scaler: &mut scaling::Context,
    decoded: &ffmpeg::frame::Video,
) -> std::result::Result<RgbImage, ffmpeg::Error> {
    let mut rgb_frame = ffmpeg::frame::Video::empty();
    scaler.run(decoded, &mut rgb_frame)?;
    rgb_frame_to_image(&rgb_frame).ok_or(ffmpeg::Error::InvalidData)
}

/// RGB24 帧按行拷贝（每行可能带有对齐填充）
fn rgb_frame_to_image(frame: &ffmpeg::frame::Video) -> Option<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let stride = frame.stride(0);
    let data = frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for y in 0..height as usize {
        let row = data.get(y * stride..y * stride + row_len)?;
        pixels.extend_from_slice(row);
    }

    RgbImage::from_raw(width, height, pixels)
}

fn rational_to_f64(rational: ffmpeg::Rational) -> Option<f64> {
    if rational.numerator() > 0 && rational.denominator() > 0 {
        Some(rational.numerator() as f64 / rational.denominator() as f64)
    } else {
        None
    }
}

/// 时间戳对应的帧号；时间戳无效或帧率未知时返回 None
pub fn frame_index_for(timestamp: f64, fps: f64) -> Option<u64> {
    if !timestamp.is_finite() || timestamp < 0.0 || fps <= 0.0 {
        return None;
    }
    Some((timestamp * fps).round() as u64)
}

/// 视频内时间戳对应的帧号
///
/// `timestamp >= duration` 视为超出视频；最后半帧内的时间戳取整后会落到
/// `frame_count`，此时取最后一帧。帧数未知（为 0）时不做范围限制。
pub fn frame_index_within(timestamp: f64, metadata: &VideoMetadata) -> Option<u64> {
    let index = frame_index_for(timestamp, metadata.fps)?;
    if metadata.frame_count == 0 {
        return Some(index);
    }
    if timestamp >= metadata.duration {
        return None;
    }
    Some(index.min(metadata.frame_count - 1))
}

/// 容器记录的帧数优先，否则按 时长 × 帧率 估算
fn estimate_frame_count(recorded: i64, duration_seconds: f64, fps: f64) -> u64 {
    if recorded > 0 {
        recorded as u64
    } else if fps > 0.0 && duration_seconds > 0.0 {
        (duration_seconds * fps).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub const CLIP_WIDTH: u32 = 64;
    pub const CLIP_HEIGHT: u32 = 48;

    /// 编码一段 MPEG-4/AVI 测试视频：前 `cut_at` 帧为黑色，之后为白色
    pub fn write_test_clip(path: &Path, frames: u64, fps: i32, cut_at: u64) -> PathBuf {
        ffmpeg::init().unwrap();
        let time_base = ffmpeg::Rational::new(1, fps);

        let mut output = ffmpeg::format::output(&path).unwrap();
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4).unwrap();
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let mut stream = output.add_stream(codec).unwrap();
        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder.set_width(CLIP_WIDTH);
        encoder.set_height(CLIP_HEIGHT);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(ffmpeg::Rational::new(fps, 1)));
        encoder.set_gop(10);
        encoder.set_bit_rate(1_000_000);
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder.open_as(codec).unwrap();
        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);
        let stream_index = stream.index();

        output.write_header().unwrap();
        let stream_time_base = output.stream(stream_index).unwrap().time_base();

        let write_packets = |encoder: &mut ffmpeg::encoder::video::Encoder,
                                 output: &mut ffmpeg::format::context::Output| {
            let mut packet = ffmpeg::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(stream_index);
                packet.rescale_ts(time_base, stream_time_base);
                packet.write_interleaved(output).unwrap();
            }
        };

        for i in 0..frames {
            let luma = if i < cut_at { 16 } else { 235 };
            let mut frame =
                ffmpeg::frame::Video::new(ffmpeg::format::Pixel::YUV420P, CLIP_WIDTH, CLIP_HEIGHT);
            frame.data_mut(0).fill(luma);
            frame.data_mut(1).fill(128);
            frame.data_mut(2).fill(128);
            frame.set_pts(Some(i as i64));

            encoder.send_frame(&frame).unwrap();
            write_packets(&mut encoder, &mut output);
        }
        encoder.send_eof().unwrap();
        write_packets(&mut encoder, &mut output);
        output.write_trailer().unwrap();

        path.to_path_buf()
    }

    /// 图像平均亮度
    pub fn mean_luma(image: &DynamicImage) -> f64 {
        let gray = image.to_luma8();
        let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
        sum as f64 / (gray.width() * gray.height()) as f64
    }
}

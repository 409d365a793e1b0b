use std::env;

/// Output language for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Zh,
}

/// Messages shown around the results table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Address,
    CompressionDetails,
    OriginalSize,
    CompressedSize,
    CompressionRatio,
    CompressionFailure,
    StartCompressingImage,
    CompressImageComplete,
    CompressImageFailure,
    StartGeneratingArchive,
    GenerateArchiveSuccess,
    GenerateArchiveFailure,
    NoImagesFound,
}

impl Language {
    /// Language from a locale tag such as `zh`, `zh_CN.UTF-8` or `en-US`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .split(['_', '-', '.'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            "zh" => Some(Language::Zh),
            _ => None,
        }
    }

    /// Language of the current environment, falling back to English
    pub fn detect() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .find(|value| !value.is_empty())
            .and_then(|value| Self::from_tag(&value))
            .unwrap_or_default()
    }

    pub fn text(&self, message: Message) -> &'static str {
        match self {
            Language::En => match message {
                Message::Address => "File",
                Message::CompressionDetails => "Compression details",
                Message::OriginalSize => "original size",
                Message::CompressedSize => "compressed size",
                Message::CompressionRatio => "compression ratio",
                Message::CompressionFailure => "compression failed",
                Message::StartCompressingImage => "Compressing images",
                Message::CompressImageComplete => "Image compression complete",
                Message::CompressImageFailure => "Image compression failed",
                Message::StartGeneratingArchive => "Generating archive",
                Message::GenerateArchiveSuccess => "Archive generated",
                Message::GenerateArchiveFailure => "Archive generation failed",
                Message::NoImagesFound => "No image files found in the input paths",
            },
            Language::Zh => match message {
                Message::Address => "文件",
                Message::CompressionDetails => "压缩详情",
                Message::OriginalSize => "原始大小",
                Message::CompressedSize => "压缩后大小",
                Message::CompressionRatio => "压缩率",
                Message::CompressionFailure => "压缩失败",
                Message::StartCompressingImage => "正在压缩图片",
                Message::CompressImageComplete => "图片压缩完成",
                Message::CompressImageFailure => "图片压缩失败",
                Message::StartGeneratingArchive => "正在生成压缩包",
                Message::GenerateArchiveSuccess => "压缩包生成成功",
                Message::GenerateArchiveFailure => "压缩包生成失败",
                Message::NoImagesFound => "输入路径中没有找到图片文件",
            },
        }
    }
}

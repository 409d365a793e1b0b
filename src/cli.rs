use crate::formats::{ArchiveFormat, ImageType};
use crate::locale::Language;
use crate::options::{RunOptions, ServiceConfig};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tiny-squeeze",
    about = "Batch image compression through the TinyPNG web service",
    long_about = "tiny-squeeze uploads PNG, JPEG and WebP images to the TinyPNG web backend, \
                  downloads the compressed results and writes them back in place. \
                  Inputs can be single images, directories or tar/tgz/zip archives; \
                  results can optionally be packed into an archive afterwards.",
    version,
    disable_version_flag = true,
    after_help = "EXAMPLES:\n  \
    tiny-squeeze photo.png\n  \
    tiny-squeeze ./images -r\n  \
    tiny-squeeze bundle.zip -z\n  \
    tiny-squeeze ./images -c webp -z tgz\n  \
    tiny-squeeze photo.png -l zh"
)]
pub struct Args {
    #[arg(
        help = "Images, directories or archives (tar, tgz, zip) to compress",
        required_unless_present = "version"
    )]
    pub paths: Vec<PathBuf>,

    #[arg(short = 'v', long, action = ArgAction::SetTrue, help = "Show installed version")]
    pub version: bool,

    #[arg(
        short = 'z',
        long,
        value_name = "EXT",
        num_args = 0..=1,
        default_missing_value = "zip",
        help = "Pack the inputs into an archive afterwards (zip, tar or tgz; default: zip)",
        long_help = "After compression, pack every input into an archive next to it. \
                     Archives given as input are rebuilt from their compressed contents. \
                     Accepts zip, tar or tgz; a bare -z produces zip."
    )]
    pub zip: Option<ArchiveFormat>,

    #[arg(
        short = 'c',
        long,
        value_name = "FORMAT",
        help = "Convert images to another format (png, jpg, jpeg, webp)"
    )]
    pub convert: Option<ImageType>,

    #[arg(short = 'r', long, help = "Scan directories recursively")]
    pub recursive: bool,

    #[arg(
        short = 'l',
        long,
        value_name = "LANG",
        help = "Output language: zh (Chinese) or en (English)",
        long_help = "Language for the results table and notices. \
                     Defaults to the language of the current locale; \
                     unrecognised tags fall back to English."
    )]
    pub language: Option<String>,

    #[arg(long, value_name = "SECS", help = "Per-request timeout in seconds (default: 60)")]
    pub timeout: Option<u64>,

    #[arg(long, env = "TINY_SQUEEZE_ENDPOINT", hide = true)]
    pub endpoint: Option<String>,

    #[arg(long, conflicts_with = "quiet", help = "Show debug diagnostics")]
    pub verbose: bool,

    #[arg(long, help = "Only show errors and the results table")]
    pub quiet: bool,
}

impl Args {
    pub fn into_options(self) -> RunOptions {
        RunOptions {
            paths: self.paths,
            convert: self.convert,
            recursive: self.recursive,
            archive: self.zip,
            language: self
                .language
                .map(|tag| Language::from_tag(&tag).unwrap_or_default())
                .unwrap_or_else(Language::detect),
            service: ServiceConfig::new(self.endpoint, self.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_zip_flag_defaults_to_zip() {
        let args = Args::try_parse_from(["tiny-squeeze", "-z", "--", "a.png"]).unwrap();
        assert_eq!(args.zip, Some(ArchiveFormat::Zip));
        assert_eq!(args.paths, vec![PathBuf::from("a.png")]);
    }

    #[test]
    fn test_zip_flag_with_extension() {
        let args = Args::try_parse_from(["tiny-squeeze", "a.png", "--zip", "tgz"]).unwrap();
        assert_eq!(args.zip, Some(ArchiveFormat::Tgz));
    }

    #[test]
    fn test_convert_and_flags() {
        let args =
            Args::try_parse_from(["tiny-squeeze", "-r", "-c", "webp", "-l", "zh", "dir"]).unwrap();
        let options = args.into_options();
        assert!(options.recursive);
        assert_eq!(options.convert, Some(ImageType::WebP));
        assert_eq!(options.language, Language::Zh);
        assert_eq!(options.archive, None);
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let args = Args::try_parse_from(["tiny-squeeze", "-l", "fr", "a.png"]).unwrap();
        assert_eq!(args.into_options().language, Language::En);

        let args = Args::try_parse_from(["tiny-squeeze", "--language", "zh_CN.UTF-8", "a.png"]).unwrap();
        assert_eq!(args.into_options().language, Language::Zh);
    }

    #[test]
    fn test_invalid_convert_target_is_rejected() {
        assert!(Args::try_parse_from(["tiny-squeeze", "-c", "gif", "a.png"]).is_err());
    }

    #[test]
    fn test_paths_required_without_version() {
        assert!(Args::try_parse_from(["tiny-squeeze"]).is_err());
        assert!(Args::try_parse_from(["tiny-squeeze", "-v"]).unwrap().version);
    }
}

use std::{
    path::{
        PathBuf
    },
    time::{
        Duration
    }
};
use clap::{
    Arg,
    App,
    ArgMatches
};
use crate::{
    loading::{
        LoadingConfig,
        RetryPolicy
    }
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamQuality {
    Maximum,
    Resolution(String)
}

#[derive(Debug)]
pub struct DownloadArguments {
    pub output_file: Option<PathBuf>,
    pub stream_quality_value: StreamQuality,
    pub loading: LoadingConfig
}

#[derive(Debug)]
pub enum Action {
    Download(DownloadArguments),
    List
}

#[derive(Debug)]
pub enum VerboseLevel{
    None,
    Medium,
    Max
}

#[derive(Debug)]
pub struct AppArguments {
    pub input: String,
    pub verbose: VerboseLevel,
    pub action: Action
}

fn build_app() -> App<'static, 'static> {
    App::new("HLS loader")
        .version("0.1.0")
        .about("Downloads segmented HLS streams into a single ordered stream")
        .arg(Arg::with_name("list")
            .short("l")
            .long("list")
            .next_line_help(true)
            .conflicts_with_all(&[
                "output",
                "resolution"
            ])
            .help("Print available stream resolutions and exit"))
        .arg(Arg::with_name("input")
                .help("Page url with <source> tag, master playlist url or chunk list url")
                .required(true))
        .arg(Arg::with_name("resolution")
            .short("r")
            .long("resolution")
            .takes_value(true)
            .next_line_help(true)
            .help("Stream resolution like 1280x720, highest bandwidth stream is used if not provided"))
        .arg(Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .next_line_help(true)
                .help("Output file path, stdout is used if not provided"))
        .arg(Arg::with_name("routines")
            .short("c")
            .long("routines")
            .takes_value(true)
            .default_value("1")
            .validator(positive_number)
            .help("Chunks loading at the same time"))
        .arg(Arg::with_name("attempts")
            .short("a")
            .long("attempts")
            .takes_value(true)
            .default_value("3")
            .validator(positive_number)
            .help("Loading attempts for every chunk"))
        .arg(Arg::with_name("retry_delay")
            .long("retry_delay")
            .takes_value(true)
            .default_value("1000")
            .validator(number)
            .help("Base delay before chunk retry in milliseconds"))
        .arg(Arg::with_name("max_retry_delay")
            .long("max_retry_delay")
            .takes_value(true)
            .validator(number)
            .help("Upper bound for a single retry delay in milliseconds, unbounded if not provided"))
        .arg(Arg::with_name("chunk_timeout")
            .long("chunk_timeout")
            .takes_value(true)
            .default_value("30")
            .validator(positive_number)
            .help("Single chunk request timeout in seconds"))
        .arg(Arg::with_name("verbose")
            .short("v")
            .long("verbose")
            .takes_value(true)
            .default_value("0")
            .possible_values(&[
                "0",
                "1",
                "2"
            ])
            .help("Print additional verbose information"))
}

fn number(value: String) -> Result<(), String> {
    value.parse::<u64>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a number", value))
}

fn positive_number(value: String) -> Result<(), String> {
    match value.parse::<u64>() {
        Ok(v) if v > 0 => Ok(()),
        _ => Err(format!("'{}' must be a number more than 0", value))
    }
}

// Значения уже проверены валидаторами clap
fn number_value(matches: &ArgMatches, name: &str) -> Option<u64> {
    matches
        .value_of(name)
        .and_then(|v| v.parse::<u64>().ok())
}

fn arguments_from_matches(matches: &ArgMatches) -> AppArguments {
    let input = matches.value_of("input")
        .map(|v| v.to_owned())
        .unwrap_or_default();
    let verbose = match matches.value_of("verbose") {
        Some("1") => VerboseLevel::Medium,
        Some("2") => VerboseLevel::Max,
        _ => VerboseLevel::None
    };

    if matches.is_present("list") {
        return AppArguments{
            input,
            verbose,
            action: Action::List
        };
    }

    let output_file = matches
        .value_of("output")
        .map(PathBuf::from);
    let stream_quality_value = match matches.value_of("resolution") {
        Some(resolution) => StreamQuality::Resolution(resolution.to_owned()),
        None => StreamQuality::Maximum
    };

    let defaults = RetryPolicy::default();
    let retry = RetryPolicy{
        max_attempts: number_value(matches, "attempts")
            .map(|v| v as u32)
            .unwrap_or(defaults.max_attempts),
        base_delay: number_value(matches, "retry_delay")
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_delay),
        max_delay: number_value(matches, "max_retry_delay")
            .map(Duration::from_millis),
        attempt_timeout: number_value(matches, "chunk_timeout")
            .map(Duration::from_secs)
            .or(defaults.attempt_timeout),
        multiplier_range: defaults.multiplier_range
    };
    let loading = LoadingConfig{
        concurrency_limit: number_value(matches, "routines")
            .map(|v| v as usize)
            .unwrap_or(1),
        retry
    };

    AppArguments{
        input,
        verbose,
        action: Action::Download(DownloadArguments{
            output_file,
            stream_quality_value,
            loading
        })
    }
}

pub fn parse_arguments() -> AppArguments {
    let matches = build_app().get_matches();
    arguments_from_matches(&matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AppArguments, clap::Error> {
        build_app()
            .get_matches_from_safe(args.iter())
            .map(|m| arguments_from_matches(&m))
    }

    #[test]
    fn test_defaults() {
        let arguments = parse(&["hls_loader", "https://video.test/page.html"]).unwrap();
        assert_eq!(arguments.input, "https://video.test/page.html");
        match arguments.action {
            Action::Download(download) => {
                assert_eq!(download.stream_quality_value, StreamQuality::Maximum);
                assert!(download.output_file.is_none());
                assert_eq!(download.loading.concurrency_limit, 1);
                assert_eq!(download.loading.retry.max_attempts, 3);
                assert_eq!(download.loading.retry.base_delay, Duration::from_millis(1000));
                assert_eq!(download.loading.retry.max_delay, None);
            },
            Action::List => panic!("download expected")
        }
    }

    #[test]
    fn test_full_download_arguments() {
        let arguments = parse(&[
            "hls_loader", "https://video.test/page.html",
            "-r", "1280x720", "-c", "8", "-a", "5", "-o", "out.ts",
            "--retry_delay", "200", "--max_retry_delay", "5000", "-v", "2"
        ]).unwrap();
        assert!(matches!(arguments.verbose, VerboseLevel::Max));
        match arguments.action {
            Action::Download(download) => {
                assert_eq!(download.stream_quality_value, StreamQuality::Resolution("1280x720".to_owned()));
                assert_eq!(download.output_file, Some(PathBuf::from("out.ts")));
                assert_eq!(download.loading.concurrency_limit, 8);
                assert_eq!(download.loading.retry.max_attempts, 5);
                assert_eq!(download.loading.retry.base_delay, Duration::from_millis(200));
                assert_eq!(download.loading.retry.max_delay, Some(Duration::from_millis(5000)));
            },
            Action::List => panic!("download expected")
        }
    }

    #[test]
    fn test_zero_routines_rejected() {
        assert!(parse(&["hls_loader", "https://video.test/", "-c", "0"]).is_err());
        assert!(parse(&["hls_loader", "https://video.test/", "-a", "0"]).is_err());
        assert!(parse(&["hls_loader", "https://video.test/", "-c", "many"]).is_err());
    }

    #[test]
    fn test_list_action() {
        let arguments = parse(&["hls_loader", "-l", "https://video.test/master.m3u8"]).unwrap();
        assert!(matches!(arguments.action, Action::List));
    }
}

mod app_arguments;
mod error;
mod logs;
mod loading;
mod playlist;
mod receivers;

use tokio::{
    runtime::{
        Builder
    }
};
use reqwest::{
    Client,
    Url
};
use log::{
    debug,
    error,
    info
};
use self::{
    app_arguments::{
        parse_arguments,
        Action,
        DownloadArguments
    },
    error::{
        AppError
    },
    loading::{
        run_loading,
        HttpChunkSource
    },
    logs::{
        setup_logs
    },
    playlist::{
        list_streams,
        resolve_chunk_addresses
    },
    receivers::{
        start_file_receiver,
        start_stdout_receiver
    }
};

async fn print_streams(http_client: &Client, input_url: &Url) -> Result<(), AppError> {
    let streams = list_streams(http_client, input_url).await?;
    if streams.is_empty() {
        info!("Input is a plain chunk list, no streams to select");
        return Ok(());
    }
    for stream in streams {
        info!("{}: bandwidth {}, {}",
              stream.resolution.as_deref().unwrap_or("unknown resolution"),
              stream.bandwidth,
              stream.uri);
    }
    Ok(())
}

async fn download(http_client: Client, input_url: Url, arguments: DownloadArguments) -> Result<(), AppError> {
    let addresses = resolve_chunk_addresses(&http_client, &input_url, &arguments.stream_quality_value).await?;

    let receiver = match arguments.output_file {
        Some(path) => start_file_receiver(path),
        None => start_stdout_receiver()
    };

    let source = HttpChunkSource::new(http_client);
    let loading_result = tokio::select! {
        result = run_loading(source, addresses, arguments.loading, &receiver) => result,
        _ = tokio::signal::ctrl_c() => Err(AppError::Interrupted)
    };

    // Даже при ошибке загрузки дописываем уже полученные данные
    let (_, written) = receiver.finish_after(loading_result).await?;
    debug!("Output finished, {} bytes", written);

    Ok(())
}

async fn async_main() -> Result<(), AppError> {
    let arguments = parse_arguments();
    setup_logs(&arguments.verbose);
    debug!("Arguments: {:?}", arguments);

    let input_url = Url::parse(&arguments.input)?;
    let http_client = Client::new();

    match arguments.action {
        Action::List => {
            print_streams(&http_client, &input_url).await
        },
        Action::Download(download_arguments) => {
            download(http_client, input_url, download_arguments).await
        }
    }
}

fn main() {
    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()
        .expect("Tokio runtime build failed");

    if let Err(err) = runtime.block_on(async_main()) {
        error!("{}", err);
        std::process::exit(1);
    }
}

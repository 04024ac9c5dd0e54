use log::info;
use yeller::{Client, ClientOptions, CustomData, LogErrorHandler};

fn main() {
    pretty_env_logger::formatted_builder()
        .parse_filters("info,yeller=debug")
        .init();

    // Nothing listens on these, so every host is tried and the failure is logged.
    let options = ClientOptions::new("demo-key")
        .hostnames(["127.0.0.1:1", "127.0.0.1:2"])
        .error_handler(LogErrorHandler::new().target("demo"));
    let client = Client::with_options(options).expect("could not create client");

    info!("reporting to {:?}", client.hostnames());
    if let Err(err) = client.notify_message("demo failure", CustomData::new()) {
        info!("notify returned: {}", err);
    }
}

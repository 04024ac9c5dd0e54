use std::sync::Arc;

use yeller::{Client, CustomData, WriterErrorHandler};

fn main() {
    let api_key = std::env::var("YELLER_API_KEY").unwrap_or_else(|_| "demo-key".into());
    let client = Client::new(api_key, "development", Arc::new(WriterErrorHandler::stderr()))
        .expect("could not create client");

    let mut info = CustomData::new();
    info.insert("user_id".into(), 42.into());
    info.insert("params".into(), serde_json::json!({ "page": 3 }));

    let err = "not a number".parse::<u32>().unwrap_err();
    match client.notify_error(&err, info) {
        Ok(()) => println!("reported via {}", client.current_host()),
        Err(err) => println!("could not report: {}", err),
    }
}

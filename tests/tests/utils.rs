use mock_service::MockConfig;
use std::sync::OnceLock;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("ledgerbench=debug,mock_service=debug")
            .init();
    });
}

/// Start a mock ledger for the current test and return its base URL.
#[allow(unused)]
pub async fn mock(config: MockConfig) -> String {
    init();
    let addr = mock_service::spawn(config)
        .await
        .expect("mock ledger failed to bind");
    format!("http://{addr}")
}

/// Start a mock ledger gRPC server for the current test and return its address.
#[allow(unused)]
pub async fn mock_grpc(config: MockConfig) -> String {
    init();
    let addr = mock_service::spawn_grpc(config)
        .await
        .expect("mock ledger gRPC failed to bind");
    format!("http://{addr}")
}

#[allow(unused)]
pub fn account_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("0.0.{}", 1000 + i)).collect()
}

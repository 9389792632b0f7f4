use std::time::Duration;
use tickwise::{
    config::EngineConfig, engine::MarketEngine, logging::init_logging, sink::ChannelSignalSink,
};
use tickwise_data::{feed::transport::WebSocketFeed, symbol::Symbol};
use tickwise_integration::channel::Channel;
use tracing::info;

const FEED_URL: &str = "wss://feed.example.com/ws";
const CONFIG: &str = r#"
{
    "retentionBars": 300,
    "dedupWindowSecs": 60,
    "historyCap": 50,
    "reconnectBackoffSecs": 3,
    "symbols": ["R_100", "R_50"],
    "timeframe": 60
}
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = EngineConfig::from_json_str(CONFIG)?;
    let transport = WebSocketFeed::new(FEED_URL)?;

    let Channel { tx, mut rx } = Channel::new();
    let engine = MarketEngine::init(config.clone(), transport, ChannelSignalSink::new(tx)).await?;

    let mut report = tokio::time::interval(Duration::from_secs(30));
    let deadline = tokio::time::sleep(Duration::from_secs(600));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            Some(signal) = rx.recv() => {
                info!(
                    symbol = %signal.symbol,
                    kind = %signal.kind,
                    condition = %signal.condition_id,
                    price = signal.price,
                    "received signal"
                );
            }
            _ = report.tick() => {
                for symbol in &config.symbols {
                    report_symbol(&engine, symbol, &config);
                }
                info!(state = %engine.connection_state(), stats = ?engine.feed_stats(), "feed health");
            }
            _ = &mut deadline => break,
        }
    }

    engine.shutdown().await?;
    Ok(())
}

fn report_symbol(engine: &MarketEngine<ChannelSignalSink>, symbol: &Symbol, config: &EngineConfig) {
    let Some(snapshot) = engine.get_snapshot(symbol, config.timeframe) else {
        info!(%symbol, "awaiting data");
        return;
    };

    let patterns = engine
        .get_patterns(symbol, config.timeframe)
        .iter()
        .map(|pattern| format!("{} {}", pattern.emoji(), pattern.label()))
        .collect::<Vec<_>>();

    info!(
        %symbol,
        price = snapshot.price,
        rsi = ?snapshot.rsi,
        bias = %snapshot.bias,
        buy_score = snapshot.buy_score,
        sell_score = snapshot.sell_score,
        ?patterns,
        "market snapshot"
    );
}

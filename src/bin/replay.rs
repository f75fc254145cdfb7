use matchbook::{EngineConfig, EngineEvent, MarketReplay, MatchingEngine};

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: replay <orders.csv> [tick_size]");
        std::process::exit(2);
    };
    let tick_size: f64 = args
        .next()
        .map(|raw| raw.parse().expect("tick_size must be a number"))
        .unwrap_or(0.01);

    let config = EngineConfig {
        tick_size,
        ..Default::default()
    };
    let mut engine = MatchingEngine::new(config);

    let mut replay = MarketReplay::new();
    let loaded = match replay.load_from_path(&path, tick_size) {
        Ok(count) => count,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let mut events = Vec::new();
    let processed = replay.replay_all(&mut engine, Some(&mut events));

    let mut trades = 0usize;
    let mut traded_qty = 0u64;
    let mut rejects = 0usize;
    for event in &events {
        match event {
            EngineEvent::Trade(t) => {
                trades += 1;
                traded_qty += t.qty;
            }
            EngineEvent::Rejected(_) => rejects += 1,
            _ => {}
        }
    }

    println!("=== Replay Report ===");
    println!("Messages:   {loaded}");
    println!("Processed:  {processed}");
    println!("Events:     {}", events.len());
    println!("Trades:     {trades} ({traded_qty} qty)");
    println!("Rejects:    {rejects}");
    println!("Open:       {}", engine.book().total_orders());

    let top = engine.best_bid_ask();
    let bid = top
        .best_bid
        .is_valid()
        .then(|| format!("{:.2} x {}", top.best_bid.to_f64(tick_size), top.bid_qty))
        .unwrap_or_else(|| "-".to_owned());
    let ask = top
        .best_ask
        .is_valid()
        .then(|| format!("{:.2} x {}", top.best_ask.to_f64(tick_size), top.ask_qty))
        .unwrap_or_else(|| "-".to_owned());
    println!("Top:        {bid} / {ask}");
}

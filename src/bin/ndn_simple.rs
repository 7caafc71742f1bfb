//! 参考场景：consumer(N0) -> N2 -> ARED 瓶颈 -> N3 -> producer(N5)
//!
//! consumer 使用 CUBIC 风格窗口对 ECN 标记与超时做出反应；结束时打印
//! 瓶颈队列的 ARED 统计。

use clap::Parser;
use ndnsim_rs::queue::{PacketQueue, RedQueue};
use ndnsim_rs::sim::{SimTime, Simulator};
use ndnsim_rs::topo::simple::{SimpleOpts, build_simple};
use ndnsim_rs::trace::TraceRecorder;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "ndn-simple", about = "NDN 参考场景仿真：CUBIC consumer 经 ARED+ECN 瓶颈请求 producer")]
struct Args {
    /// JSON 场景文件（整体覆盖默认参数，命令行参数再覆盖它）
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// 随机种子
    #[arg(long)]
    seed: Option<u64>,

    /// 仿真运行到多少毫秒
    #[arg(long)]
    until_ms: Option<u64>,

    /// consumer 停止时刻（毫秒）
    #[arg(long)]
    stop_ms: Option<u64>,

    /// consumer 请求的序列号数；不填则不限
    #[arg(long)]
    max_seq: Option<u64>,

    /// 瓶颈带宽（bps）
    #[arg(long)]
    bottleneck_bps: Option<u64>,

    /// 瓶颈单向传播时延（毫秒）
    #[arg(long)]
    bottleneck_latency_ms: Option<u64>,

    /// producer 所在节点编号（0..=5）
    #[arg(long)]
    producer_node: Option<usize>,

    /// CUBIC 乘性减小因子
    #[arg(long)]
    beta: Option<f64>,

    /// 关闭 RED 的 ECN（改为丢包）
    #[arg(long)]
    no_ecn: bool,

    /// 关闭 ARED 自适应
    #[arg(long)]
    no_adaptive: bool,

    /// 每个节点的内容缓存容量；0 表示关闭
    #[arg(long)]
    cs_capacity: Option<usize>,

    /// 输出遥测记录 JSON（速率、丢包、时延、PIT 超时）
    #[arg(long)]
    trace_json: Option<PathBuf>,

    /// 输出 consumer 窗口采样 CSV（每个 Data/超时采样一次）
    #[arg(long)]
    cwnd_csv: Option<PathBuf>,

    /// 输出一行 JSON 汇总到 stdout
    #[arg(long)]
    json: bool,

    /// 不打印日志或统计信息（仅输出到文件）
    #[arg(long)]
    quiet: bool,
}

fn load_opts(args: &Args) -> Result<SimpleOpts, String> {
    let mut opts = match &args.scenario {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|e| format!("read scenario {}: {e}", path.display()))?;
            serde_json::from_str::<SimpleOpts>(&raw)
                .map_err(|e| format!("parse scenario {}: {e}", path.display()))?
        }
        None => SimpleOpts::default(),
    };
    if let Some(seed) = args.seed {
        opts.seed = seed;
    }
    if let Some(ms) = args.until_ms {
        opts.until = SimTime::from_millis(ms);
    }
    if let Some(ms) = args.stop_ms {
        opts.consumer.stop = Some(SimTime::from_millis(ms));
    }
    if args.max_seq.is_some() {
        opts.consumer.max_seq = args.max_seq;
    }
    if let Some(bps) = args.bottleneck_bps {
        opts.bottleneck_bps = bps;
    }
    if let Some(ms) = args.bottleneck_latency_ms {
        opts.bottleneck_latency = SimTime::from_millis(ms);
    }
    if let Some(node) = args.producer_node {
        opts.producer_node = node;
    }
    if let Some(beta) = args.beta {
        opts.consumer.beta = beta;
    }
    if args.no_ecn {
        opts.red.ecn = false;
    }
    if args.no_adaptive {
        opts.red.adaptive = false;
    }
    if let Some(cap) = args.cs_capacity {
        opts.forwarder.cs_capacity = cap;
    }
    Ok(opts)
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            if args.quiet {
                tracing_subscriber::EnvFilter::new("off")
            } else {
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            },
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let opts = match load_opts(&args) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::FAILURE;
        }
    };
    let (mut world, handles) = match build_simple(&opts) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut sim = Simulator::default();
    world.net.start(&mut sim, opts.until, opts.trace.rate_period);
    sim.run_until(opts.until, &mut world);

    let net = &world.net;

    if let Some(path) = &args.trace_json {
        if let Some(rec) = net.sink_as::<TraceRecorder>() {
            let json = serde_json::to_string_pretty(rec).expect("serialize trace records");
            fs::write(path, json).expect("write trace json");
            if !args.quiet {
                eprintln!("wrote trace records to {}", path.display());
            }
        }
    }

    let consumer = net.consumer(handles.consumer).expect("consumer exists");

    if let Some(path) = &args.cwnd_csv {
        let mut out = String::from("t_ns,cwnd,ssthresh,in_flight\n");
        for s in consumer.window_samples() {
            out.push_str(&format!(
                "{},{:.6},{:.6},{}\n",
                s.t_ns, s.cwnd, s.ssthresh, s.in_flight
            ));
        }
        fs::write(path, out).expect("write cwnd csv");
        if !args.quiet {
            eprintln!("wrote cwnd samples to {}", path.display());
        }
    }

    let served = net.producer(handles.producer).map_or(0, |p| p.served());
    let link = net.link(handles.bottleneck).expect("bottleneck link exists");
    let qstats = link.queue.stats();
    let max_p = link
        .queue
        .as_any()
        .downcast_ref::<RedQueue>()
        .map(|red| red.max_p());
    let cstats = consumer.stats();

    if args.json {
        let summary = serde_json::json!({
            "now_ns": sim.now().0,
            "events": sim.executed(),
            "consumer": cstats,
            "cwnd": consumer.window().cwnd(),
            "producer_served": served,
            "bottleneck": qstats,
            "max_p": max_p,
            "net": {
                "transmitted_pkts": net.stats.transmitted_pkts,
                "transmitted_bytes": net.stats.transmitted_bytes,
                "marked_pkts": net.stats.marked_pkts,
                "dropped_pkts": net.stats.dropped_pkts,
                "pit_timeouts": net.stats.pit_timeouts,
            },
        });
        println!("{summary}");
    } else if !args.quiet {
        println!(
            "done @ {:?}\n  consumer: sent={}, retransmitted={}, received={}, marked={}, timeouts={}, cwnd={:.3}\n  producer: served={}\n  net: transmitted_pkts={}, transmitted_bytes={}, marked_pkts={}, dropped_pkts={}, pit_timeouts={}",
            sim.now(),
            cstats.sent,
            cstats.retransmitted,
            cstats.received,
            cstats.marked,
            cstats.timeouts,
            consumer.window().cwnd(),
            served,
            net.stats.transmitted_pkts,
            net.stats.transmitted_bytes,
            net.stats.marked_pkts,
            net.stats.dropped_pkts,
            net.stats.pit_timeouts,
        );
        println!(
            "*** ARED stats from N2 -> N3 queue ***\n  enqueued={}, dequeued={}, marked={}, early_drops={}, forced_drops={}, overflow_drops={}, max_p={:?}, q_len={}",
            qstats.enqueued,
            qstats.dequeued,
            qstats.marked,
            qstats.early_drops,
            qstats.forced_drops,
            qstats.overflow_drops,
            max_p,
            link.queue.len(),
        );
    }
    ExitCode::SUCCESS
}

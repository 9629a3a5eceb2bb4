//! 백테스트 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # CSV 캔들로 백테스트 실행
//! quant backtest -b data/600519_daily.csv -d ma_crossover,rsi_reversal -o report.json
//!
//! # 설정 파일 지정
//! quant backtest -b data/600519_daily.csv -c config.toml -d ma_crossover
//!
//! # 단일 파라미터 민감도 스윕
//! quant sensitivity -b data/600519_daily.csv -d ma_crossover \
//!     --param short_period --values 2,3,5,8
//! ```

use clap::{Parser, Subcommand};

mod commands;
mod data;

use commands::{backtest::run_backtest, sensitivity::run_sensitivity};

#[derive(Parser)]
#[command(name = "quant")]
#[command(about = "백테스트 & 전략 검증 CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// CSV 캔들 데이터로 백테스트 실행
    Backtest {
        /// 캔들 CSV 파일 (컬럼: date,open,high,low,close,volume)
        #[arg(short, long)]
        bars: String,

        /// 백테스트 설정 TOML 파일 (생략 시 기본값)
        #[arg(short, long)]
        config: Option<String>,

        /// 탐지기 목록 (쉼표 구분, 예: "ma_crossover,rsi_reversal")
        #[arg(short, long, default_value = "ma_crossover")]
        detectors: String,

        /// 전략 파라미터 JSON 파일 (생략 시 기본값)
        #[arg(short, long)]
        params: Option<String>,

        /// 리포트 JSON 저장 경로 (생략 시 요약만 출력)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// 파라미터 민감도 스윕 실행
    Sensitivity {
        /// 캔들 CSV 파일 (컬럼: date,open,high,low,close,volume)
        #[arg(short, long)]
        bars: String,

        /// 백테스트 설정 TOML 파일 (생략 시 기본값)
        #[arg(short, long)]
        config: Option<String>,

        /// 탐지기 목록 (쉼표 구분)
        #[arg(short, long, default_value = "ma_crossover")]
        detectors: String,

        /// 전략 파라미터 JSON 파일 (생략 시 기본값)
        #[arg(long)]
        params: Option<String>,

        /// 스윕할 파라미터 이름
        #[arg(long)]
        param: String,

        /// 그리드 값 목록 (쉼표 구분, 예: "2,3,5,8")
        #[arg(long)]
        values: String,

        /// 동시 실행 포인트 수
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// 리포트 JSON 저장 경로
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            bars,
            config,
            detectors,
            params,
            output,
        } => run_backtest(&bars, config.as_deref(), &detectors, params.as_deref(), output.as_deref()),
        Commands::Sensitivity {
            bars,
            config,
            detectors,
            params,
            param,
            values,
            concurrency,
            output,
        } => {
            run_sensitivity(
                &bars,
                config.as_deref(),
                &detectors,
                params.as_deref(),
                &param,
                &values,
                concurrency,
                output.as_deref(),
            )
            .await
        }
    }
}

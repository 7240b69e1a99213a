use battlesim::logging::{LogConfig, LogOutput, init_logging, level_for_verbosity, parse_log_level};
use battlesim::scenario::ScenarioConfig;
use battlesim::simulation::SimulationEngine;
use clap::{Arg, ArgMatches, Command};

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("battlesim")
        .version("0.1.0")
        .about("戦車戦シミュレーション (Tank Battle Simulation)")
        .long_about(
            "二陣営の大規模戦車戦シミュレーション\n\
             並列衝突判定と凸包フォースフィールドによるフレーム駆動シミュレーションを実行します。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了"),
        )
        .arg(
            Arg::new("frames")
                .short('f')
                .long("frames")
                .value_name("N")
                .value_parser(clap::value_parser!(u64).range(1..))
                .help("最大フレーム数を上書き"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .help("ワーカースレッド数を上書き (0: 自動)"),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .value_name("FILE")
                .help("実行結果をYAMLで書き出す"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: フレーム単位)"),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .get_matches();

    let Some(scenario_path) = matches.get_one::<String>("scenario") else {
        show_default_help();
        return;
    };

    if let Err(e) = run_scenario(scenario_path, &matches) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// シナリオファイルを読み込んで実行
fn run_scenario(scenario_path: &str, matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let verbose_level = matches.get_count("verbose");

    // シナリオファイルの読み込み
    let mut scenario = ScenarioConfig::from_file(scenario_path)?;

    // 情報表示のみの場合
    if matches.get_flag("info") {
        scenario.print_summary();
        return Ok(());
    }

    if let Some(&frames) = matches.get_one::<u64>("frames") {
        scenario.sim.max_frames = frames;
    }
    if let Some(&workers) = matches.get_one::<usize>("workers") {
        scenario.sim.workers = workers;
    }

    let output: LogOutput = matches
        .get_one::<String>("log-output")
        .map(|value| value.parse::<LogOutput>())
        .transpose()?
        .unwrap_or(LogOutput::Console);
    let level = matches
        .get_one::<String>("log-level")
        .map(|value| parse_log_level(value))
        .unwrap_or_else(|| level_for_verbosity(verbose_level));
    let _log_guard = init_logging(LogConfig {
        level,
        output,
        ..LogConfig::default()
    })?;

    // 基本情報表示
    scenario.print_summary();
    println!();

    // シミュレーションエンジンの作成と初期化
    let mut simulation = SimulationEngine::new(scenario, verbose_level)?;
    simulation.initialize()?;

    // シミュレーション実行
    let stats = simulation.run();

    if let Some(report_path) = matches.get_one::<String>("report") {
        stats.write_yaml(report_path)?;
        println!("レポートを書き出しました: {}", report_path);
    }

    Ok(())
}

/// デフォルトヘルプを表示
fn show_default_help() {
    println!("戦車戦シミュレーション (Tank Battle Simulation) - battlesim v0.1.0");
    println!();
    println!("使用方法:");
    println!("  battlesim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>   シナリオファイルを指定して実行");
    println!("  -i, --info              シナリオ情報のみ表示");
    println!("  -f, --frames <N>        最大フレーム数を上書き");
    println!("  -w, --workers <N>       ワーカースレッド数を上書き");
    println!("  -r, --report <FILE>     実行結果をYAMLで書き出す");
    println!("  -v, --verbose           詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-output <T>    ログ出力先 (console, file, both)");
    println!("      --log-level <L>     ログレベル");
    println!("  -h, --help              このヘルプを表示");
    println!();
    println!("例:");
    println!("  battlesim -s scenarios/battle_default.yaml");
    println!("  battlesim -s scenarios/battle_default.yaml -i");
    println!("  battlesim -s scenarios/battle_default.yaml -f 500 -w 4 -r report.yaml");
}

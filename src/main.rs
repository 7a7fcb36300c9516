use anyhow::{bail, Context, Result};
use psplay::buffer::Document;
use psplay::config::Preferences;
use psplay::convert::Converter;
use psplay::editor::Editor;
use psplay::pdf::{ExternalViewer, NoViewer, PdfOutput};
use psplay::session::{ConvertStatus, Playground};
use psplay::state::Mode;
use psplay::syntax::{highlight_document, supports_true_color};
use psplay::terminal::Terminal;
use psplay::utils;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const HELP: &str = "\
psplay - A terminal PostScript playground

USAGE:
  psplay [OPTIONS] [FILE]

OPTIONS:
  --highlight             Print FILE with syntax colors and exit
  --convert               Convert FILE to PDF once, print the converter output and exit
  --auto                  Start in automatic mode (autosave and convert while typing)
  --converter PATH        Converter program (ps2pdf, pstopdf, ...)
  --converter-arg ARG     Argument passed before the input and output paths
  --prefs PATH            Preferences file (default: $PSPLAY_PREFS or
                          $XDG_CONFIG_HOME/psplay/preferences.json)
  --log FILE              Write log output to FILE
  --debug                 Enable debug logging
  -h, --help              Print help
  -V, --version           Print version

KEYBOARD SHORTCUTS:
  Ctrl+S    Save                      Ctrl+R    Save and convert
  Ctrl+T    Toggle automatic mode     Ctrl+E    Show converter output
  Ctrl+O    Open                      Ctrl+N    New document
  Ctrl+G    Open recent               Ctrl+P    Save PDF as
  Ctrl+K    Settings                  F5        Revert to saved
  Ctrl+Z    Undo                      Ctrl+Y    Redo
  Ctrl+L    Toggle line numbers       Ctrl+Q    Quit (press twice if modified)
  Esc       Clear message
";

#[derive(Debug)]
struct Args {
    highlight: bool,
    convert: bool,
    auto: bool,
    converter: Option<PathBuf>,
    converter_arg: Option<String>,
    prefs: Option<PathBuf>,
    log: Option<PathBuf>,
    debug: bool,
    file: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);
        return Ok(None);
    }
    if pargs.contains(["-V", "--version"]) {
        println!("psplay {}", env!("CARGO_PKG_VERSION"));
        return Ok(None);
    }

    let args = Args {
        highlight: pargs.contains("--highlight"),
        convert: pargs.contains("--convert"),
        auto: pargs.contains("--auto"),
        converter: pargs.opt_value_from_str("--converter")?,
        converter_arg: pargs.opt_value_from_str("--converter-arg")?,
        prefs: pargs.opt_value_from_str("--prefs")?,
        log: pargs.opt_value_from_str("--log")?,
        debug: pargs.contains("--debug"),
        file: pargs.opt_free_from_str()?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("Unexpected arguments: {:?}", remaining);
    }
    if args.highlight && args.convert {
        bail!("--highlight and --convert cannot be used together");
    }
    Ok(Some(args))
}

fn load_preferences(args: &Args) -> Result<(Preferences, PathBuf)> {
    let path = args.prefs.clone().unwrap_or_else(Preferences::default_path);
    let prefs = Preferences::load(&path)?;
    Ok((prefs, path))
}

/// `--converter` / `--converter-arg` 只用於這次執行，不寫回偏好設定
fn converter_override(args: &Args, prefs: &Preferences) -> Option<Converter> {
    let timeout = prefs.converter_timeout_secs.map(Duration::from_secs);
    match (&args.converter, &args.converter_arg) {
        (Some(program), argument) => {
            let argument = argument
                .clone()
                .or_else(|| Converter::default_argument_for(program).map(str::to_string))
                .unwrap_or_default();
            Some(Converter::new(program, argument).with_timeout(timeout))
        }
        (None, Some(argument)) => prefs
            .converter()
            .map(|c| Converter::new(c.program(), argument.clone()).with_timeout(c.timeout())),
        (None, None) => None,
    }
}

/// `--highlight`：輸出上色後的原始碼
fn highlight(prefs: &Preferences, file: &Path) -> Result<()> {
    let document = Document::open(file)?;
    let colored = highlight_document(
        &document.text(),
        &prefs.syntax_colors(),
        supports_true_color(),
        prefs.highlight_limit,
    );

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(colored.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// `--convert`：轉換一次，成功時 PDF 放在原始檔旁邊
fn convert(prefs: Preferences, converter: Option<Converter>, file: &Path) -> Result<bool> {
    // 不寫回偏好設定
    let mut playground = Playground::new(prefs, None, PdfOutput::in_temp_dir(), NoViewer);
    if let Some(converter) = converter {
        playground.set_converter(converter);
    }
    playground.open(file)?;

    let status = playground.convert()?;
    if let Some(conversion) = playground.last_conversion() {
        print!("{}", conversion.stdout);
        eprint!("{}", conversion.stderr);
    }

    match status {
        ConvertStatus::Converted => {
            let target = playground
                .pdf()
                .target()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| file.with_extension("pdf"));
            playground.save_pdf_as(&target)?;
            println!("Wrote {}", target.display());
            Ok(true)
        }
        ConvertStatus::Failed | ConvertStatus::NeedsPath => Ok(false),
    }
}

fn edit(
    args: &Args,
    prefs: Preferences,
    prefs_path: PathBuf,
    converter: Option<Converter>,
) -> Result<()> {
    let viewer = ExternalViewer::new(prefs.pdf_viewer.clone());
    let mut playground = Playground::new(prefs, Some(prefs_path), PdfOutput::in_temp_dir(), viewer);
    if let Some(converter) = converter {
        playground.set_converter(converter);
    }
    if args.auto {
        playground.set_mode(Mode::Automatic);
    }
    if let Some(file) = &args.file {
        playground
            .open(file)
            .with_context(|| format!("Failed to open {}", file.display()))?;
    }

    let mut editor = Editor::new(playground, supports_true_color())?;

    // 設置 panic hook 以確保終端正常恢復
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = Terminal::exit_raw_mode();
        let _ = Terminal::show_cursor();
        original_hook(panic_info);
    }));

    editor.run()
}

fn main() -> Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    utils::init_logger(args.debug, args.log.as_deref())?;
    let (prefs, prefs_path) = load_preferences(&args)?;
    let converter = converter_override(&args, &prefs);

    if args.highlight || args.convert {
        let Some(file) = &args.file else {
            bail!("A FILE is required with --highlight or --convert");
        };
        if args.highlight {
            return highlight(&prefs, file);
        }
        if !convert(prefs, converter, file)? {
            std::process::exit(1);
        }
        return Ok(());
    }

    edit(&args, prefs, prefs_path, converter)
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use flowmodel::{
    Component, ComponentEvent, Flow, FlowKind, Project, RuntimeEvent, RuntimeMode, VariableDecl,
};
use flowrun::{
    load_project, validate_project, DebugSnapshot, ExecutorRegistry, FlowRuntime, FlowStateView,
    RuntimeConfig, SessionHandle, SessionOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "flowdbg")]
#[command(about = "Flow runtime debugger CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a project file
    Run {
        /// Path to project JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Start paused under the debugger with an interactive command loop
        #[arg(short, long)]
        debug: bool,

        /// Settings file backing persistent global variables
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a project file
    Validate {
        /// Path to project JSON file
        file: PathBuf,
    },

    /// List available component types
    Components,

    /// Create a new example project
    Init {
        /// Output file path
        #[arg(short, long, default_value = "project.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            debug,
            settings,
            verbose,
        } => {
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::INFO)
                    .init();
            }

            run_project(file, debug, settings).await?;
        }

        Commands::Validate { file } => {
            validate_file(file)?;
        }

        Commands::Components => {
            list_components();
        }

        Commands::Init { output } => {
            create_example_project(output)?;
        }
    }

    Ok(())
}

fn build_registry() -> Arc<ExecutorRegistry> {
    let mut registry = ExecutorRegistry::new();
    flowcomponents::register_all(&mut registry);
    Arc::new(registry)
}

async fn run_project(file: PathBuf, debug: bool, settings: Option<PathBuf>) -> Result<()> {
    println!("🚀 Loading project from: {}", file.display());
    let project = load_project(&file)?;

    println!("📋 Project: {}", project.name);
    println!("   Pages: {}", project.pages.len());
    println!("   Actions: {}", project.actions.len());
    println!();

    let registry = build_registry();
    let report = validate_project(&project, Some(&registry));
    for issue in report.warnings() {
        println!("⚠️  {}", issue);
    }
    if report.has_errors() {
        for issue in report.errors() {
            println!("❌ {}", issue);
        }
        return Err(anyhow::anyhow!("project failed validation"));
    }

    let runtime = FlowRuntime::with_registry(registry, RuntimeConfig::default());

    // Spawn event listener for real-time output
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(event);
        }
    });

    let options = SessionOptions {
        debugger_active: debug,
        settings_path: settings,
    };

    // Keep the authored graph around for name-based breakpoint commands.
    let authored = project.clone();
    let handle = runtime.start_session(project, options);

    if debug {
        debugger_loop(&handle, &authored).await?;
    } else {
        // Wait for the queue to drain and every component run to finish.
        let snapshot = handle
            .wait_until(|s| s.mode == RuntimeMode::Running && s.is_idle())
            .await?;
        if let Some(error) = &snapshot.error {
            println!("💥 Session error: {}", error);
        }
        handle.stop().await?;
    }

    handle.join().await?;
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("✨ Session finished");
    Ok(())
}

async fn debugger_loop(handle: &SessionHandle, project: &Project) -> Result<()> {
    println!("🐞 Debugger attached. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = handle.snapshot();
        if snapshot.mode == RuntimeMode::Stopped {
            break;
        }
        print_prompt(&snapshot);

        let Some(line) = lines.next_line().await? else {
            handle.stop().await.ok();
            break;
        };
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");
        let argument = parts.next();

        match command {
            "" => {}
            "run" => handle.run().await?,
            "pause" => handle.pause().await?,
            "resume" | "continue" | "c" => handle.resume().await?,
            "step" | "s" => handle.single_step().await?,
            "stop" | "quit" | "q" => {
                handle.stop().await?;
                break;
            }
            "queue" => print_queue(&handle.snapshot()),
            "tree" => print_tree(&handle.snapshot()),
            "vars" => print_vars(&handle.snapshot()),
            "history" => print_history(&handle.snapshot()),
            "break" | "b" => {
                breakpoint_command(handle, project, argument, BreakpointOp::Add).await?
            }
            "clear" => breakpoint_command(handle, project, argument, BreakpointOp::Remove).await?,
            "enable" => breakpoint_command(handle, project, argument, BreakpointOp::Enable).await?,
            "disable" => {
                breakpoint_command(handle, project, argument, BreakpointOp::Disable).await?
            }
            "help" => print_help(),
            other => println!("unknown command '{}'; type 'help'", other),
        }

        // Let the pump process the command before re-reading the snapshot.
        tokio::task::yield_now().await;
    }
    Ok(())
}

enum BreakpointOp {
    Add,
    Remove,
    Enable,
    Disable,
}

async fn breakpoint_command(
    handle: &SessionHandle,
    project: &Project,
    name: Option<&str>,
    op: BreakpointOp,
) -> Result<()> {
    let Some(name) = name else {
        println!("usage: break|clear|enable|disable <component name>");
        return Ok(());
    };
    let Some((_, component)) = project.find_component_by_name(name) else {
        println!("no component named '{}'", name);
        return Ok(());
    };
    match op {
        BreakpointOp::Add => handle.add_breakpoint(component.id).await?,
        BreakpointOp::Remove => handle.remove_breakpoint(component.id).await?,
        BreakpointOp::Enable => handle.enable_breakpoint(component.id).await?,
        BreakpointOp::Disable => handle.disable_breakpoint(component.id).await?,
    }
    Ok(())
}

fn print_prompt(snapshot: &DebugSnapshot) {
    let selected = snapshot
        .selected_queue_task
        .and_then(|id| snapshot.queue.iter().find(|t| t.id == id))
        .map(|t| format!(" next: {}", t.label))
        .unwrap_or_default();
    println!("[{}]{} >", snapshot.mode, selected);
}

fn print_queue(snapshot: &DebugSnapshot) {
    if snapshot.queue.is_empty() {
        println!("queue is empty");
        return;
    }
    for task in &snapshot.queue {
        let marker = if Some(task.id) == snapshot.selected_queue_task {
            "▶"
        } else {
            " "
        };
        println!("{} #{:<4} {}", marker, task.id, task.label);
    }
}

fn print_tree(snapshot: &DebugSnapshot) {
    for view in &snapshot.flow_states {
        print_flow_state(view, 0);
    }
}

fn print_flow_state(view: &FlowStateView, depth: usize) {
    let indent = "  ".repeat(depth);
    let status = if view.has_error {
        "error"
    } else if view.is_finished {
        "finished"
    } else {
        "live"
    };
    println!("{}{} ({:?}, {})", indent, view.flow, view.kind, status);
    for component in &view.components {
        let running = if component.is_running { " [running]" } else { "" };
        println!(
            "{}  • {} ({}){}",
            indent, component.label, component.type_name, running
        );
    }
    for child in &view.children {
        print_flow_state(child, depth + 1);
    }
}

fn print_vars(snapshot: &DebugSnapshot) {
    println!("globals:");
    for var in &snapshot.globals {
        println!("  {} = {}", var.name, var.value);
    }
}

fn print_history(snapshot: &DebugSnapshot) {
    for item in &snapshot.recent_history {
        println!(
            "  {} {:?} {}",
            item.timestamp.format("%H:%M:%S%.3f"),
            item.kind,
            item.message
        );
    }
}

fn print_help() {
    println!("  run | pause | resume | step | stop   debugger transitions");
    println!("  queue | tree | vars | history        inspect session state");
    println!("  break/clear/enable/disable <name>    breakpoint by component name");
}

fn print_event(event: RuntimeEvent) {
    match event {
        RuntimeEvent::SessionStarted { project, .. } => {
            println!("▶️  Session started: {}", project);
        }
        RuntimeEvent::SessionStopped { error, .. } => match error {
            Some(error) => println!("💥 Session stopped with error: {}", error),
            None => println!("⏹️  Session stopped"),
        },
        RuntimeEvent::ModeChanged { mode, .. } => {
            println!("🔁 Mode: {}", mode);
        }
        RuntimeEvent::ComponentStarted {
            component,
            component_type,
            ..
        } => {
            println!("  ⚡ Running: {} ({})", component, component_type);
        }
        RuntimeEvent::ComponentCompleted {
            component,
            duration_ms,
            ..
        } => {
            println!("  ✅ {} completed in {}ms", component, duration_ms);
        }
        RuntimeEvent::ComponentFailed {
            component, error, ..
        } => {
            println!("  ❌ {} failed: {}", component, error);
        }
        RuntimeEvent::ComponentEvent { component, event, .. } => match event {
            ComponentEvent::Info { message } => println!("     ℹ️  [{}] {}", component, message),
            ComponentEvent::Warning { message } => println!("     ⚠️  [{}] {}", component, message),
            ComponentEvent::Progress { percent, message } => match message {
                Some(message) => println!("     📊 [{}] {}% - {}", component, percent, message),
                None => println!("     📊 [{}] {}%", component, percent),
            },
            ComponentEvent::Data { .. } => {}
        },
        RuntimeEvent::FlowStateCreated { flow, parent, .. } => {
            if parent.is_some() {
                println!("  🌱 Action instance started: {}", flow);
            }
        }
        RuntimeEvent::FlowStateFinished { .. }
        | RuntimeEvent::ConnectionActivated { .. }
        | RuntimeEvent::History { .. } => {}
    }
}

fn validate_file(file: PathBuf) -> Result<()> {
    println!("🔍 Validating project: {}", file.display());

    let project = load_project(&file)?;
    let registry = build_registry();
    let report = validate_project(&project, Some(&registry));

    for issue in &report.issues {
        println!("  {}", issue);
    }
    if report.has_errors() {
        return Err(anyhow::anyhow!("project failed validation"));
    }

    println!("✅ Project is valid:");
    println!("   Name: {}", project.name);
    println!("   Pages: {}", project.pages.len());
    println!("   Actions: {}", project.actions.len());
    Ok(())
}

fn list_components() {
    println!("📦 Available Component Types:");
    println!();

    let registry = build_registry();
    for type_name in registry.list_types() {
        if let Some(metadata) = registry.metadata(&type_name) {
            println!("  • {} ({})", type_name, metadata.category);
            println!("    {}", metadata.description);
            for input in &metadata.inputs {
                let kind = if input.port.required { "required" } else { "optional" };
                println!("      in  {} ({}): {}", input.port.name, kind, input.doc);
            }
            for output in &metadata.outputs {
                println!("      out {}: {}", output.name, output.doc);
            }
        } else {
            println!("  • {}", type_name);
        }
    }
}

fn create_example_project(output: PathBuf) -> Result<()> {
    let mut page = Flow::new("Main", FlowKind::Page);

    let start = Component::new("data.constant")
        .with_name("Start")
        .with_config("value", 5.0)
        .with_output("value")
        .with_position(100.0, 100.0);
    let add = Component::new("math.arithmetic")
        .with_name("Add")
        .with_config("operation", "add")
        .with_config("b", 1.0)
        .with_input("a")
        .with_output("result")
        .with_position(300.0, 100.0);
    let display = Component::new("debug.log")
        .with_name("Display")
        .with_input("message")
        .with_output("next")
        .with_position(500.0, 100.0);

    let start_id = page.add_component(start);
    let add_id = page.add_component(add);
    let display_id = page.add_component(display);

    page.connect(start_id, "value", add_id, "a");
    page.connect(add_id, "result", display_id, "message");

    let mut project = Project::new("Example Project");
    project.global_variables.push(VariableDecl::persistent(
        "launch_count",
        0.0,
    ));
    project.add_page(page);

    let json = serde_json::to_string_pretty(&project)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example project: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  flowdbg run --file {}", output.display());
    println!("  flowdbg run --file {} --debug", output.display());
    Ok(())
}

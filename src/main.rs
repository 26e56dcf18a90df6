use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};

use clubdesk::config::{self, Settings};
use clubdesk::context::{AppContext, Session};
use clubdesk::export::{self, ExportOutcome};
use clubdesk::formation::{self, Formation};
use clubdesk::lineup::{DragPayload, DragSource, DropOutcome, DropTarget, LineupState};
use clubdesk::lineup_pdf;
use clubdesk::model::{
    Evaluation, Match, MedicalKind, MedicalRecord, MedicalStatus, Organization, PhysicalTest,
    Player, PositionCategory, Venue, WellnessEntry,
};
use clubdesk::permissions::{AccessLevel, Section};
use clubdesk::store::SaveOutcome;
use clubdesk::summary::{Roster, format_avg, summarize_evaluations};
use clubdesk::theme::Theme;

#[derive(Parser)]
#[command(name = "clubdesk")]
#[command(version)]
#[command(about = "Club roster, lineup and performance desk", long_about = None)]
struct Cli {
    /// SQLite database (overrides CLUBDESK_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Session file written at sign-in (overrides CLUBDESK_SESSION)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// Export directory (overrides CLUBDESK_EXPORT_DIR)
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Organization profile and theme
    Org {
        #[command(subcommand)]
        cmd: OrgCmd,
    },
    Category {
        #[command(subcommand)]
        cmd: CategoryCmd,
    },
    Player {
        #[command(subcommand)]
        cmd: PlayerCmd,
    },
    Match {
        #[command(subcommand)]
        cmd: MatchCmd,
    },
    /// Formation layouts; needs no session
    Formation {
        #[command(subcommand)]
        cmd: FormationCmd,
    },
    Lineup {
        #[command(subcommand)]
        cmd: LineupCmd,
    },
    Eval {
        #[command(subcommand)]
        cmd: EvalCmd,
    },
    Wellness {
        #[command(subcommand)]
        cmd: WellnessCmd,
    },
    Physical {
        #[command(subcommand)]
        cmd: PhysicalCmd,
    },
    Medical {
        #[command(subcommand)]
        cmd: MedicalCmd,
    },
    Export {
        #[command(subcommand)]
        cmd: ExportCmd,
    },
}

#[derive(Subcommand)]
enum OrgCmd {
    /// Create or update the signed-in organization
    Init {
        name: String,
        #[arg(long)]
        primary: Option<String>,
        #[arg(long)]
        secondary: Option<String>,
        #[arg(long)]
        accent: Option<String>,
        #[arg(long)]
        logo: Option<String>,
    },
    Show,
}

#[derive(Subcommand)]
enum CategoryCmd {
    Add { name: String },
    List,
}

#[derive(Subcommand)]
enum PlayerCmd {
    Add {
        name: String,
        #[arg(long)]
        number: Option<u32>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        number: Option<u32>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    List {
        /// Include players marked as deleted
        #[arg(long)]
        all: bool,
    },
    /// Soft-delete a player; history keeps resolving
    Remove {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum MatchCmd {
    Add {
        opponent: String,
        /// e.g. "2025-09-06 11:00"
        kickoff: String,
        #[arg(long, default_value = "home")]
        venue: String,
        #[arg(long)]
        competition: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    List,
    Result {
        id: String,
        goals_for: u32,
        goals_against: u32,
    },
}

#[derive(Subcommand)]
enum FormationCmd {
    Layout { formation: String },
    Presets,
}

#[derive(Copy, Clone, ValueEnum)]
enum FromArg {
    Field,
    Bench,
    Roster,
}

#[derive(Subcommand)]
enum LineupCmd {
    Show {
        match_id: String,
    },
    /// Switch formation, carrying players over by position
    Formation {
        match_id: String,
        formation: String,
    },
    Assign {
        match_id: String,
        slot: String,
        player: String,
    },
    Clear {
        match_id: String,
        slot: String,
    },
    /// Toggle a player on the bench
    Bench {
        match_id: String,
        player: String,
    },
    /// Toggle a player in the not-called list
    NotCalled {
        match_id: String,
        player: String,
    },
    /// Drag a player onto a slot or the bench
    Drag {
        match_id: String,
        player: String,
        /// Slot label or "bench"
        to: String,
        #[arg(long, value_enum, default_value = "roster")]
        from: FromArg,
    },
    Sub {
        match_id: String,
        player_in: String,
        player_out: String,
        minute: String,
    },
    Unsub {
        match_id: String,
        index: usize,
    },
    Comment {
        match_id: String,
        text: String,
    },
    /// Report unfilled slots, double bookings and unplaced players
    Check {
        match_id: String,
    },
}

#[derive(Subcommand)]
enum EvalCmd {
    Add {
        match_id: String,
        player: String,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long, default_value_t = 0)]
        goals: u32,
        #[arg(long, default_value_t = 0)]
        assists: u32,
        #[arg(long, default_value_t = 0)]
        yellow: u32,
        #[arg(long, default_value_t = 0)]
        red: u32,
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    Summary {
        #[arg(long)]
        match_id: Option<String>,
        #[arg(long)]
        player: Option<String>,
    },
}

#[derive(Subcommand)]
enum WellnessCmd {
    Add {
        player: String,
        date: String,
        sleep: u8,
        fatigue: u8,
        soreness: u8,
        stress: u8,
        mood: u8,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[derive(Subcommand)]
enum PhysicalCmd {
    Add {
        player: String,
        date: String,
        test: String,
        value: f64,
        #[arg(long, default_value = "")]
        unit: String,
        #[arg(long)]
        lower_is_better: bool,
    },
}

#[derive(Subcommand)]
enum MedicalCmd {
    Add {
        player: String,
        description: String,
        started_on: String,
        #[arg(long, default_value = "injury")]
        kind: String,
        #[arg(long)]
        expected_return: Option<String>,
    },
    Recover {
        record_id: String,
    },
    List {
        #[arg(long)]
        player: Option<String>,
        #[arg(long)]
        active: bool,
    },
}

#[derive(Subcommand)]
enum ExportCmd {
    Roster,
    Evaluations {
        #[arg(long)]
        match_id: Option<String>,
    },
    Performance,
    LineupPdf {
        match_id: String,
    },
}

fn main() -> Result<()> {
    config::load_dotenv();
    init_logging();
    let cli = Cli::parse();

    if let Command::Formation { cmd } = &cli.command {
        return run_formation(cmd);
    }

    let mut settings = Settings::from_env()?;
    if let Some(db) = cli.db.clone() {
        settings.db_path = db;
    }
    if let Some(session) = cli.session.clone() {
        settings.session_path = session;
    }
    if let Some(out) = cli.out.clone() {
        settings.export_dir = out;
    }

    let session = Session::load(&settings.session_path)?;
    let mut ctx = AppContext::initialize(&settings, session)?;
    let result = dispatch(&mut ctx, &settings, cli.command);
    let failed = result.is_err();
    if let Err(err) = result {
        ctx.notices_mut().error(format!("{err:#}"));
    }
    for notice in ctx.teardown()? {
        eprintln!("{notice}");
    }
    if failed {
        // Already reported as a notice above.
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging() {
    let env = env_logger::Env::default()
        .filter_or("CLUBDESK_LOG", "info")
        .write_style("CLUBDESK_LOG_STYLE");
    let mut builder = env_logger::Builder::from_env(env);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format_timestamp(None).init();
}

fn dispatch(ctx: &mut AppContext, settings: &Settings, command: Command) -> Result<()> {
    match command {
        Command::Org { cmd } => run_org(ctx, cmd),
        Command::Category { cmd } => run_category(ctx, cmd),
        Command::Player { cmd } => run_player(ctx, cmd),
        Command::Match { cmd } => run_match(ctx, cmd),
        Command::Formation { cmd } => run_formation(&cmd),
        Command::Lineup { cmd } => run_lineup(ctx, cmd),
        Command::Eval { cmd } => run_eval(ctx, cmd),
        Command::Wellness { cmd } => run_wellness(ctx, cmd),
        Command::Physical { cmd } => run_physical(ctx, cmd),
        Command::Medical { cmd } => run_medical(ctx, cmd),
        Command::Export { cmd } => run_export(ctx, &settings.export_dir, cmd),
    }
}

fn run_org(ctx: &mut AppContext, cmd: OrgCmd) -> Result<()> {
    match cmd {
        OrgCmd::Init {
            name,
            primary,
            secondary,
            accent,
            logo,
        } => {
            ctx.require(Section::Settings, AccessLevel::Edit)?;
            let current = ctx.theme().clone();
            let mut theme = Theme::new(
                primary.as_deref().unwrap_or(&current.primary),
                secondary.as_deref().unwrap_or(&current.secondary),
                accent.as_deref().unwrap_or(&current.accent),
            )?;
            theme.logo_url = logo.or(current.logo_url);
            let org = Organization {
                id: ctx.org_id().to_string(),
                name: name.trim().to_string(),
                theme,
            };
            ctx.store().upsert_organization(&org)?;
            ctx.refresh_organization()?;
            println!("Organization {} ready ({})", org.name, org.id);
        }
        OrgCmd::Show => {
            ctx.require(Section::Dashboard, AccessLevel::View)?;
            let org = ctx.organization();
            println!("{} ({})", org.name, org.id);
            println!(
                "colours: primary {} secondary {} accent {}",
                org.theme.primary, org.theme.secondary, org.theme.accent
            );
            if let Some(logo) = &org.theme.logo_url {
                println!("logo: {logo}");
            }
            println!("role: {:?}", ctx.permissions().role());
            println!("landing: {}", ctx.permissions().landing_section());
        }
    }
    Ok(())
}

fn run_category(ctx: &mut AppContext, cmd: CategoryCmd) -> Result<()> {
    match cmd {
        CategoryCmd::Add { name } => {
            ctx.require(Section::Settings, AccessLevel::Edit)?;
            let category = ctx.store().add_category(ctx.org_id(), &name)?;
            println!("{}  {}", category.id, category.name);
        }
        CategoryCmd::List => {
            ctx.require(Section::Players, AccessLevel::View)?;
            for category in ctx.store().categories(ctx.org_id())? {
                println!("{}  {}", category.id, category.name);
            }
        }
    }
    Ok(())
}

fn run_player(ctx: &mut AppContext, cmd: PlayerCmd) -> Result<()> {
    match cmd {
        PlayerCmd::Add {
            name,
            number,
            position,
            category,
        } => {
            ctx.require_in(Section::Players, category.as_deref(), AccessLevel::Edit)?;
            let player = Player {
                id: String::new(),
                organization_id: ctx.org_id().to_string(),
                category_id: category,
                name,
                jersey_number: number,
                position: parse_position(position.as_deref())?,
                deleted: false,
            };
            let saved = ctx.store().save_player(ctx.org_id(), &player)?;
            println!("Added {} ({})", saved.name, saved.id);
        }
        PlayerCmd::Edit {
            id,
            name,
            number,
            position,
            category,
        } => {
            let mut player = ctx
                .store()
                .player(ctx.org_id(), &id)?
                .ok_or_else(|| anyhow!("player {id} not found"))?;
            ctx.require_in(
                Section::Players,
                player.category_id.as_deref(),
                AccessLevel::Edit,
            )?;
            if let Some(name) = name {
                player.name = name;
            }
            if number.is_some() {
                player.jersey_number = number;
            }
            if position.is_some() {
                player.position = parse_position(position.as_deref())?;
            }
            if category.is_some() {
                ctx.require_in(Section::Players, category.as_deref(), AccessLevel::Edit)?;
                player.category_id = category;
            }
            let saved = ctx.store().save_player(ctx.org_id(), &player)?;
            println!("Updated {} ({})", saved.name, saved.id);
        }
        PlayerCmd::List { all } => {
            ctx.require(Section::Players, AccessLevel::View)?;
            for p in ctx.store().players(ctx.org_id(), all)? {
                println!(
                    "{:<36} {:>3} {:<11} {}",
                    p.id,
                    p.jersey_number.map(|n| n.to_string()).unwrap_or_default(),
                    p.position.map(|pos| pos.key()).unwrap_or("-"),
                    p.display_name()
                );
            }
        }
        PlayerCmd::Remove { id, yes } => {
            let player = ctx
                .store()
                .player(ctx.org_id(), &id)?
                .ok_or_else(|| anyhow!("player {id} not found"))?;
            ctx.require_in(
                Section::Players,
                player.category_id.as_deref(),
                AccessLevel::Edit,
            )?;
            if !yes {
                return Err(anyhow!(
                    "removing {} needs --yes; lineups and history keep the record",
                    player.name
                ));
            }
            ctx.store().soft_delete_player(ctx.org_id(), &id)?;
            ctx.notices_mut()
                .info(format!("{} marked as deleted", player.name));
        }
    }
    Ok(())
}

fn run_match(ctx: &mut AppContext, cmd: MatchCmd) -> Result<()> {
    match cmd {
        MatchCmd::Add {
            opponent,
            kickoff,
            venue,
            competition,
            category,
        } => {
            ctx.require_in(Section::Matches, category.as_deref(), AccessLevel::Edit)?;
            let venue = Venue::parse(&venue).ok_or_else(|| anyhow!("unknown venue {venue}"))?;
            let fixture = Match {
                id: String::new(),
                organization_id: ctx.org_id().to_string(),
                category_id: category,
                opponent,
                kickoff,
                venue,
                competition,
                goals_for: None,
                goals_against: None,
            };
            let saved = ctx.store().save_match(ctx.org_id(), &fixture)?;
            println!("Added match vs {} ({})", saved.opponent, saved.id);
        }
        MatchCmd::List => {
            ctx.require(Section::Matches, AccessLevel::View)?;
            for m in ctx.store().matches(ctx.org_id())? {
                let score = match (m.goals_for, m.goals_against) {
                    (Some(f), Some(a)) => format!("{f}-{a}"),
                    _ => "-".to_string(),
                };
                println!(
                    "{:<36} {:<17} {:<7} {:<5} {}",
                    m.id,
                    m.kickoff,
                    m.venue.key(),
                    score,
                    m.opponent
                );
            }
        }
        MatchCmd::Result {
            id,
            goals_for,
            goals_against,
        } => {
            let fixture = ctx
                .store()
                .match_by_id(ctx.org_id(), &id)?
                .ok_or_else(|| anyhow!("match {id} not found"))?;
            ctx.require_in(
                Section::Matches,
                fixture.category_id.as_deref(),
                AccessLevel::Edit,
            )?;
            ctx.store()
                .set_match_result(ctx.org_id(), &id, goals_for, goals_against)?;
            println!("{} {goals_for}-{goals_against}", fixture.opponent);
        }
    }
    Ok(())
}

fn run_formation(cmd: &FormationCmd) -> Result<()> {
    match cmd {
        FormationCmd::Layout { formation } => {
            let parsed = Formation::parse(formation)?;
            for slot in parsed.layout() {
                println!(
                    "{:<5} line {} top {:>5.1} left {:>5.1}",
                    slot.label, slot.line, slot.top, slot.left
                );
            }
        }
        FormationCmd::Presets => {
            for preset in formation::presets() {
                println!("{preset}");
            }
        }
    }
    Ok(())
}

fn run_lineup(ctx: &mut AppContext, cmd: LineupCmd) -> Result<()> {
    match cmd {
        LineupCmd::Show { match_id } => {
            let draft = ctx.open_lineup(&match_id)?;
            let players = ctx.store().players(ctx.org_id(), true)?;
            print_lineup(&draft.state, &Roster::new(&players));
            if let Some(etag) = &draft.etag {
                println!("version {etag}");
            }
            Ok(())
        }
        LineupCmd::Check { match_id } => {
            let draft = ctx.open_lineup(&match_id)?;
            let players = ctx.store().players(ctx.org_id(), false)?;
            let state = &draft.state;
            let empty: Vec<String> = state
                .formation()
                .slot_labels()
                .into_iter()
                .filter(|label| !state.positions().contains_key(label))
                .collect();
            let dupes = state.duplicates();
            let unplaced = state.available_players(&players);
            println!("unfilled slots: {}", list_or_none(&empty));
            println!("double bookings: {}", list_or_none(&dupes));
            let names: Vec<String> = unplaced.iter().map(|p| p.name.clone()).collect();
            println!("not placed: {}", list_or_none(&names));
            Ok(())
        }
        LineupCmd::Formation {
            match_id,
            formation,
        } => edit_lineup(ctx, &match_id, |state| {
            state.set_formation(&formation)?;
            Ok(format!("Formation set to {}", state.formation()))
        }),
        LineupCmd::Assign {
            match_id,
            slot,
            player,
        } => {
            ensure_player(ctx, &player)?;
            edit_lineup(ctx, &match_id, |state| {
                state.assign_to_slot(&slot, &player)?;
                Ok(format!("{player} in {slot}"))
            })
        }
        LineupCmd::Clear { match_id, slot } => edit_lineup(ctx, &match_id, |state| {
            Ok(match state.clear_slot(&slot) {
                Some(prev) => format!("{slot} cleared ({prev})"),
                None => format!("{slot} was already empty"),
            })
        }),
        LineupCmd::Bench { match_id, player } => {
            ensure_player(ctx, &player)?;
            edit_lineup(ctx, &match_id, |state| {
                Ok(if state.toggle_bench(&player) {
                    format!("{player} added to the bench")
                } else {
                    format!("{player} removed from the bench")
                })
            })
        }
        LineupCmd::NotCalled { match_id, player } => {
            ensure_player(ctx, &player)?;
            edit_lineup(ctx, &match_id, |state| {
                Ok(if state.toggle_not_called(&player) {
                    format!("{player} marked not called")
                } else {
                    format!("{player} no longer marked not called")
                })
            })
        }
        LineupCmd::Drag {
            match_id,
            player,
            to,
            from,
        } => {
            ensure_player(ctx, &player)?;
            let payload = DragPayload {
                player_id: player.clone(),
                source: match from {
                    FromArg::Field => DragSource::Field,
                    FromArg::Bench => DragSource::Bench,
                    FromArg::Roster => DragSource::Roster,
                },
            };
            let target = if to.eq_ignore_ascii_case("bench") {
                DropTarget::Bench
            } else {
                DropTarget::Slot(to.clone())
            };
            edit_lineup(ctx, &match_id, |state| {
                Ok(match state.drop_player(&payload, &target)? {
                    DropOutcome::Unchanged => format!("{player} already at {to}"),
                    DropOutcome::Moved => format!("{player} moved to {to}"),
                    DropOutcome::Swapped { displaced, to: went } => {
                        format!("{player} moved to {to}; {displaced} moved to {went:?}")
                    }
                })
            })
        }
        LineupCmd::Sub {
            match_id,
            player_in,
            player_out,
            minute,
        } => edit_lineup(ctx, &match_id, |state| {
            state.add_substitution(&player_in, &player_out, &minute)?;
            Ok(format!("{minute}' >> {player_in} << {player_out}"))
        }),
        LineupCmd::Unsub { match_id, index } => edit_lineup(ctx, &match_id, |state| {
            let removed = state.remove_substitution(index)?;
            Ok(format!(
                "Removed substitution {}' {} for {}",
                removed.minute, removed.player_in, removed.player_out
            ))
        }),
        LineupCmd::Comment { match_id, text } => edit_lineup(ctx, &match_id, |state| {
            state.set_comments(text.trim());
            Ok("Comments updated".to_string())
        }),
    }
}

/// Load, mutate, save against the loaded version. A concurrent change is reported, not
/// overwritten.
fn edit_lineup(
    ctx: &mut AppContext,
    match_id: &str,
    edit: impl FnOnce(&mut LineupState) -> Result<String>,
) -> Result<()> {
    let mut draft = ctx.open_lineup(match_id)?;
    let message = edit(&mut draft.state)?;
    match ctx.save_lineup(&mut draft)? {
        SaveOutcome::Saved { etag } => {
            println!("{message} (version {etag})");
            Ok(())
        }
        SaveOutcome::Conflict { current_etag } => Err(anyhow!(
            "lineup for match {match_id} changed since it was loaded (current version {})",
            current_etag.as_deref().unwrap_or("none")
        )),
    }
}

fn print_lineup(state: &LineupState, roster: &Roster<'_>) {
    let name = |id: &str| match roster.jersey(id) {
        Some(n) => format!("#{n} {}", roster.display_name(id)),
        None => roster.display_name(id),
    };
    println!("formation {}", state.formation());
    for slot in state.formation().layout() {
        let who = state
            .positions()
            .get(&slot.label)
            .map(|id| name(id))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<5} {who}", slot.label);
    }
    let bench: Vec<String> = state.bench().iter().map(|id| name(id)).collect();
    println!("bench: {}", list_or_none(&bench));
    let out: Vec<String> = state.not_called().iter().map(|id| name(id)).collect();
    println!("not called: {}", list_or_none(&out));
    for (idx, sub) in state.substitutions().iter().enumerate() {
        println!(
            "  [{idx}] {}' >> {} << {}",
            sub.minute,
            name(&sub.player_in),
            name(&sub.player_out)
        );
    }
    if !state.comments().is_empty() {
        println!("comments: {}", state.comments());
    }
}

fn run_eval(ctx: &mut AppContext, cmd: EvalCmd) -> Result<()> {
    match cmd {
        EvalCmd::Add {
            match_id,
            player,
            minutes,
            goals,
            assists,
            yellow,
            red,
            rating,
            notes,
        } => {
            ctx.require_for_match(Section::Evaluations, &match_id, AccessLevel::Edit)?;
            let saved = ctx.store().add_evaluation(
                ctx.org_id(),
                &Evaluation {
                    id: String::new(),
                    match_id,
                    player_id: player,
                    minutes,
                    goals,
                    assists,
                    yellow_cards: yellow,
                    red_cards: red,
                    rating,
                    notes,
                },
            )?;
            println!("Evaluation {} saved", saved.id);
        }
        EvalCmd::Summary { match_id, player } => {
            match (match_id.as_deref(), player.as_deref()) {
                (Some(m), _) => {
                    ctx.require_for_match(Section::Evaluations, m, AccessLevel::View)?
                }
                (None, Some(p)) => {
                    ctx.require_for_player(Section::Evaluations, p, AccessLevel::View)?
                }
                (None, None) => ctx.require(Section::Evaluations, AccessLevel::View)?,
            }
            let rows =
                ctx.store()
                    .evaluations(ctx.org_id(), match_id.as_deref(), player.as_deref())?;
            if rows.is_empty() {
                ctx.notices_mut().info("No evaluations to summarize");
                return Ok(());
            }
            let players = ctx.store().players(ctx.org_id(), true)?;
            let roster = Roster::new(&players);
            let mut summary = summarize_evaluations(&rows);
            summary.sort_by_key(|s| roster.sort_key(&s.player_id));
            println!(
                "{:<28} {:>4} {:>5} {:>3} {:>3} {:>3} {:>3} {:>6} {:>6}",
                "player", "pj", "min", "g", "a", "ta", "tr", "rating", "g/pj"
            );
            for s in summary {
                println!(
                    "{:<28} {:>4} {:>5} {:>3} {:>3} {:>3} {:>3} {:>6} {:>6}",
                    roster.display_name(&s.player_id),
                    s.matches,
                    s.minutes,
                    s.goals,
                    s.assists,
                    s.yellow_cards,
                    s.red_cards,
                    s.rating_avg.map(format_avg).unwrap_or_else(|| "-".into()),
                    format_avg(s.goals_per_match())
                );
            }
        }
    }
    Ok(())
}

fn run_wellness(ctx: &mut AppContext, cmd: WellnessCmd) -> Result<()> {
    let WellnessCmd::Add {
        player,
        date,
        sleep,
        fatigue,
        soreness,
        stress,
        mood,
        notes,
    } = cmd;
    ctx.require_for_player(Section::Wellness, &player, AccessLevel::Edit)?;
    let saved = ctx.store().add_wellness(
        ctx.org_id(),
        &WellnessEntry {
            id: String::new(),
            player_id: player,
            date,
            sleep,
            fatigue,
            soreness,
            stress,
            mood,
            notes,
        },
    )?;
    println!("Wellness for {} on {} saved", saved.player_id, saved.date);
    Ok(())
}

fn run_physical(ctx: &mut AppContext, cmd: PhysicalCmd) -> Result<()> {
    let PhysicalCmd::Add {
        player,
        date,
        test,
        value,
        unit,
        lower_is_better,
    } = cmd;
    ctx.require_for_player(Section::Physical, &player, AccessLevel::Edit)?;
    let saved = ctx.store().add_physical_test(
        ctx.org_id(),
        &PhysicalTest {
            id: String::new(),
            player_id: player,
            date,
            test,
            value,
            unit,
            lower_is_better,
        },
    )?;
    println!("{} {} {} saved", saved.test, saved.value, saved.unit);
    Ok(())
}

fn run_medical(ctx: &mut AppContext, cmd: MedicalCmd) -> Result<()> {
    match cmd {
        MedicalCmd::Add {
            player,
            description,
            started_on,
            kind,
            expected_return,
        } => {
            ctx.require_for_player(Section::Medical, &player, AccessLevel::Edit)?;
            let kind =
                MedicalKind::parse(&kind).ok_or_else(|| anyhow!("unknown medical kind {kind}"))?;
            let saved = ctx.store().add_medical_record(
                ctx.org_id(),
                &MedicalRecord {
                    id: String::new(),
                    player_id: player,
                    kind,
                    description,
                    started_on,
                    expected_return,
                    status: MedicalStatus::Active,
                },
            )?;
            println!("Medical record {} opened", saved.id);
        }
        MedicalCmd::Recover { record_id } => {
            let record = ctx
                .store()
                .medical_record(ctx.org_id(), &record_id)?
                .ok_or_else(|| anyhow!("medical record {record_id} not found"))?;
            ctx.require_for_player(Section::Medical, &record.player_id, AccessLevel::Edit)?;
            if !ctx
                .store()
                .set_medical_status(ctx.org_id(), &record_id, MedicalStatus::Recovered)?
            {
                return Err(anyhow!("medical record {record_id} not found"));
            }
            println!("Medical record {record_id} closed");
        }
        MedicalCmd::List { player, active } => {
            match player.as_deref() {
                Some(p) => ctx.require_for_player(Section::Medical, p, AccessLevel::View)?,
                None => ctx.require(Section::Medical, AccessLevel::View)?,
            }
            let records = if active {
                ctx.store().active_medical_records(ctx.org_id())?
            } else {
                ctx.store()
                    .medical_records(ctx.org_id(), player.as_deref())?
            };
            let players = ctx.store().players(ctx.org_id(), true)?;
            let roster = Roster::new(&players);
            for r in records
                .iter()
                .filter(|r| player.as_deref().is_none_or(|p| r.player_id == p))
            {
                println!(
                    "{:<36} {:<24} {:<8} {:<9} {} -> {} {}",
                    r.id,
                    roster.display_name(&r.player_id),
                    r.kind.key(),
                    r.status.key(),
                    r.started_on,
                    r.expected_return.as_deref().unwrap_or("?"),
                    r.description
                );
            }
        }
    }
    Ok(())
}

fn run_export(ctx: &mut AppContext, out_dir: &Path, cmd: ExportCmd) -> Result<()> {
    ctx.require(Section::Exports, AccessLevel::View)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create export dir {}", out_dir.display()))?;
    let stamp = chrono::Local::now().format("%Y%m%d").to_string();
    let org_id = ctx.org_id().to_string();

    let outcome = match cmd {
        ExportCmd::Roster => {
            ctx.require(Section::Players, AccessLevel::View)?;
            let players = ctx.store().players(&org_id, false)?;
            let categories = ctx.store().categories(&org_id)?;
            let injuries = if ctx.permissions().can_view(Section::Medical) {
                ctx.store().active_injuries(&org_id)?
            } else {
                Vec::new()
            };
            export::export_roster_workbook(
                &out_dir.join(format!("plantilla_{stamp}.xlsx")),
                ctx.theme(),
                &players,
                &categories,
                &injuries,
            )?
        }
        ExportCmd::Evaluations { match_id } => {
            ctx.require(Section::Evaluations, AccessLevel::View)?;
            let players = ctx.store().players(&org_id, true)?;
            let matches = ctx.store().matches(&org_id)?;
            let rows = ctx
                .store()
                .evaluations(&org_id, match_id.as_deref(), None)?;
            export::export_evaluations_workbook(
                &out_dir.join(format!("evaluaciones_{stamp}.xlsx")),
                ctx.theme(),
                &players,
                &matches,
                &rows,
            )?
        }
        ExportCmd::Performance => {
            let players = ctx.store().players(&org_id, true)?;
            let wellness = if ctx.permissions().can_view(Section::Wellness) {
                ctx.store().wellness(&org_id, None)?
            } else {
                Vec::new()
            };
            let physical = if ctx.permissions().can_view(Section::Physical) {
                ctx.store().physical_tests(&org_id, None)?
            } else {
                Vec::new()
            };
            export::export_performance_workbook(
                &out_dir.join(format!("rendimiento_{stamp}.xlsx")),
                ctx.theme(),
                &players,
                &wellness,
                &physical,
            )?
        }
        ExportCmd::LineupPdf { match_id } => {
            let draft = ctx.open_lineup(&match_id)?;
            if draft.etag.is_none() {
                ExportOutcome::Empty {
                    reason: format!("no lineup saved yet for match {match_id}"),
                }
            } else {
                let fixture = ctx
                    .store()
                    .match_by_id(&org_id, &match_id)?
                    .ok_or_else(|| anyhow!("match {match_id} not found"))?;
                let players = ctx.store().players(&org_id, true)?;
                lineup_pdf::export_lineup_pdf(
                    &out_dir.join(format!("alineacion_{match_id}.pdf")),
                    ctx.theme(),
                    &ctx.organization().name,
                    &fixture,
                    &players,
                    &draft.state.to_record(),
                )?
            }
        }
    };

    match outcome {
        ExportOutcome::Written(report) => {
            println!("Exported {}", report.path.display());
            for (section, rows) in &report.sections {
                println!("  {section}: {rows}");
            }
        }
        ExportOutcome::Empty { reason } => {
            ctx.notices_mut().info(format!("Nothing to export: {reason}"));
        }
    }
    Ok(())
}

fn ensure_player(ctx: &AppContext, player_id: &str) -> Result<()> {
    match ctx.store().player(ctx.org_id(), player_id)? {
        Some(p) if !p.deleted => Ok(()),
        Some(p) => Err(anyhow!("{} is marked as deleted", p.name)),
        None => Err(anyhow!("player {player_id} not found")),
    }
}

fn parse_position(raw: Option<&str>) -> Result<Option<PositionCategory>> {
    match raw {
        None => Ok(None),
        Some(text) => PositionCategory::parse(text)
            .map(Some)
            .ok_or_else(|| anyhow!("unknown position {text}")),
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

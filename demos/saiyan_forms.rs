//! Saiyan forms example: a contributor, a chain and a few seconds of ticks
//!
//! This example demonstrates:
//! - Registering transformations, a trait and a chain through a contributor
//! - A second contributor inserting into the first one's chain
//! - Timed entry, upkeep drain and the Ki shortfall cut-off
//! - Veto listeners and persisted fields
//!
//! Run with `RUST_LOG=kiform=debug` to see every state transition.

use kiform::chain::{always_visible, visibility, InsertAt};
use kiform::*;

struct SuperSaiyan {
    multiplier: f64,
    drain: f64,
}

impl Transformation for SuperSaiyan {
    fn configure(&self, info: &mut TransformationInfo) {
        info.transformation_time = 0.5;
        info.ki_drain = self.drain;
        info.ki_color = Some(Color::rgb(255, 230, 80));
    }

    fn on_post_transform(&self, entity: &mut Entity, fw: &Framework) {
        println!(
            "  entity {} powered up, aura {:?}",
            entity.handle(),
            entity.ki_color(fw)
        );
    }

    fn on_end_transformation(&self, entity: &mut Entity, _fw: &Framework) {
        println!("  entity {} powered down", entity.handle());
    }

    fn update(&self, entity: &mut Entity, _fw: &Framework) {
        entity.ki.max_ki = entity.ki.max_ki.scaled(self.multiplier);
    }
}

struct Kaioken;

impl Transformation for Kaioken {
    fn configure(&self, info: &mut TransformationInfo) {
        info.display_name = "Kaio-ken".to_string();
        info.transformation_time = 0.0;
        info.stackable = true;
        info.ki_color = Some(Color::rgb(220, 30, 30));
    }

    fn update(&self, entity: &mut Entity, _fw: &Framework) {
        entity.ki.regen_rate = entity.ki.regen_rate.plus(-0.5);
    }
}

struct Legendary;

impl Trait for Legendary {
    fn configure(&self, info: &mut TraitInfo) {
        info.ki_colors = vec![Color::rgb(60, 220, 60)];
    }

    fn update(&self, entity: &mut Entity, _fw: &Framework) {
        entity.ki.mastery_rate = entity.ki.mastery_rate.scaled(2.0);
    }
}

struct Saiyans;

impl Contributor for Saiyans {
    fn name(&self) -> &str {
        "saiyan"
    }

    fn load(&self, loader: &mut Loader<'_>) -> Result<(), KiError> {
        let forms = loader.create_chain("Forms", always_visible())?;
        let ssj = loader.register_transformation(
            "SSJ",
            StatusHandle(100),
            SuperSaiyan {
                multiplier: 1.5,
                drain: 30.0,
            },
        )?;
        let ssj2 = loader.register_transformation(
            "SSJ2",
            StatusHandle(101),
            SuperSaiyan {
                multiplier: 2.0,
                drain: 120.0,
            },
        )?;
        loader.register_trait("Legendary", StatusHandle(102), Legendary)?;

        loader.enqueue_insertion(forms.clone(), ssj, always_visible(), InsertAt::End);
        loader.enqueue_insertion(
            forms,
            ssj2,
            visibility(|entity| entity.ki.mastery_level() >= 2),
            InsertAt::End,
        );
        Ok(())
    }
}

struct Techniques;

impl Contributor for Techniques {
    fn name(&self) -> &str {
        "techniques"
    }

    fn load(&self, loader: &mut Loader<'_>) -> Result<(), KiError> {
        let kaioken = loader.register_transformation("Kaioken", StatusHandle(200), Kaioken)?;
        loader.enqueue_insertion("saiyan/Forms", kaioken, always_visible(), InsertAt::Index(0));
        loader.events_mut().mastery_level.subscribe(|event| {
            println!(
                "  entity {} reached mastery level {}",
                event.entity, event.current_level
            );
        });
        Ok(())
    }
}

fn main() -> Result<(), KiError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("=== Saiyan Forms Demo ===\n");

    let mut fw = Framework::load(KiConfig::default(), &[&Saiyans, &Techniques])?;
    let forms = QualifiedId::from_str("saiyan/Forms");
    let ssj = QualifiedId::from_str("saiyan/SSJ");
    let ssj2 = QualifiedId::from_str("saiyan/SSJ2");

    let mut goku = Entity::new(EntityHandle(1), fw.config(), MemoryHost::new());
    goku.enter_world(&fw);
    goku.set_trait(&fw, Some(QualifiedId::from_str("saiyan/Legendary")))?;

    // ===== Menu =====
    println!("1. Transformation menu\n");
    for id in fw.visible_nodes(&goku, &forms) {
        let name = fw
            .definitions()
            .lookup_by_id(&id)
            .map(|def| def.display_name().to_string())
            .unwrap_or_default();
        println!("  {id} ({name})");
    }
    println!();

    // ===== Timed entry =====
    println!("2. Entering SSJ (0.5 s at 60 ticks per second)\n");
    println!("  request: {:?}", goku.begin_transformation(&fw, &ssj));
    for _ in 0..30 {
        goku.tick(&fw);
    }
    println!(
        "  active: {:?}, capacity {}, Ki {:.2}\n",
        goku.current_transformation().map(QualifiedId::as_str),
        goku.ki.max_capacity(),
        goku.ki.current()
    );

    // ===== Spending earns mastery =====
    println!("3. Spending Ki\n");
    goku.ki.mastery_rate = StatModifier::new(1000.0, 0.0);
    goku.ki.add(-25.0, fw.events());
    println!("  Ki after spending: {:.2}", goku.ki.current());
    println!("  SSJ2 visible now: {}\n", fw.visible_nodes(&goku, &forms).contains(&ssj2));

    // ===== Upkeep shortfall =====
    println!("4. SSJ2 drains 2 Ki per tick\n");
    goku.begin_transformation(&fw, &ssj2);
    goku.ki.set_current(10.0);
    let mut ticks = 0;
    while goku.pending_transformation().is_some() || goku.is_transformed(true) {
        goku.tick(&fw);
        ticks += 1;
    }
    println!("  forced off after {ticks} ticks, Ki {:.2}\n", goku.ki.current());

    // ===== Vetoes =====
    println!("5. A listener vetoes every transformation\n");
    fw.events_mut().can_transform.subscribe(|_, _, verdict| verdict.veto());
    println!("  request: {:?}\n", goku.begin_transformation(&fw, &ssj));

    // ===== Persistence =====
    println!("6. Saving\n");
    goku.selected_chain = Some(forms);
    goku.selected_transformation = Some(ssj);
    let mut store = FieldStore::new();
    goku.save(&mut store);
    println!("  {}", serde_json::to_string_pretty(&store)?);

    Ok(())
}

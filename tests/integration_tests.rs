use kiform::chain::{always_visible, visibility, InsertAt};
use kiform::events::{KiChange, MasteryLevelUp};
use kiform::*;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct Form {
    name: &'static str,
    stackable: bool,
    time: f64,
    drain: f64,
    log: Log,
}

impl Form {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            stackable: false,
            time: 0.0,
            drain: 0.0,
            log: Arc::clone(log),
        }
    }

    fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    fn timed(mut self, seconds: f64) -> Self {
        self.time = seconds;
        self
    }

    fn draining(mut self, per_second: f64) -> Self {
        self.drain = per_second;
        self
    }

    fn record(&self, event: &str) {
        self.log.lock().unwrap().push(format!("{event}:{}", self.name));
    }
}

impl Transformation for Form {
    fn configure(&self, info: &mut TransformationInfo) {
        info.stackable = self.stackable;
        info.transformation_time = self.time;
        info.ki_drain = self.drain;
    }

    fn on_post_transform(&self, _entity: &mut Entity, _fw: &Framework) {
        self.record("post");
    }

    fn on_end_transformation(&self, _entity: &mut Entity, _fw: &Framework) {
        self.record("end");
    }

    fn update(&self, _entity: &mut Entity, _fw: &Framework) {}
}

struct SaiyanForms {
    log: Log,
}

impl Contributor for SaiyanForms {
    fn name(&self) -> &str {
        "mod"
    }

    fn load(&self, loader: &mut Loader<'_>) -> Result<(), KiError> {
        let chain = loader.create_chain("SaiyanForms", always_visible())?;
        let ssj = loader.register_transformation("SSJ", StatusHandle(1), Form::new("SSJ", &self.log))?;
        let ssj2 = loader.register_transformation("SSJ2", StatusHandle(2), Form::new("SSJ2", &self.log))?;
        loader.register_transformation(
            "Kaioken",
            StatusHandle(3),
            Form::new("Kaioken", &self.log).stackable(),
        )?;
        loader.register_transformation(
            "Ascended",
            StatusHandle(4),
            Form::new("Ascended", &self.log).timed(1.0),
        )?;
        loader.register_transformation(
            "Hungry",
            StatusHandle(5),
            Form::new("Hungry", &self.log).draining(60.0),
        )?;

        loader.enqueue_insertion(chain.clone(), ssj, always_visible(), InsertAt::Index(0));
        loader.enqueue_insertion(chain, ssj2, always_visible(), InsertAt::Index(0));
        Ok(())
    }
}

fn setup(config: KiConfig) -> (Framework, Log) {
    let log = Log::default();
    let fw = Framework::load(config, &[&SaiyanForms { log: Arc::clone(&log) }]).unwrap();
    (fw, log)
}

fn entity(fw: &Framework) -> Entity {
    let mut e = Entity::new(EntityHandle(1), fw.config(), MemoryHost::new());
    e.enter_world(fw);
    e
}

fn id(s: &str) -> QualifiedId {
    QualifiedId::from_str(s)
}

#[test]
fn test_same_index_insertions_insert_before() {
    let (fw, _) = setup(KiConfig::default());
    let chain = fw.chains().get(&id("mod/SaiyanForms")).unwrap();
    let ids: Vec<&str> = chain.transformation_ids().iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["mod/SSJ2", "mod/SSJ"]);
}

#[test]
fn test_exclusive_handoff_leaves_stackable_alone() {
    let (fw, log) = setup(KiConfig::default());
    let mut e = entity(&fw);

    e.begin_transformation(&fw, &id("mod/SSJ"));
    e.begin_transformation(&fw, &id("mod/Kaioken"));
    log.lock().unwrap().clear();

    assert_eq!(e.begin_transformation(&fw, &id("mod/SSJ2")), TransformOutcome::Activated);
    assert_eq!(*log.lock().unwrap(), vec!["end:SSJ", "post:SSJ2"]);
    assert_eq!(e.current_transformation(), Some(&id("mod/SSJ2")));
    assert_eq!(e.stackable_transformations(), &[id("mod/Kaioken")]);
}

#[test]
fn test_drain_shortfall_ends_without_debit() {
    let (fw, log) = setup(KiConfig::default());
    let mut e = entity(&fw);
    e.begin_transformation(&fw, &id("mod/Hungry"));

    e.ki.set_current(0.5);
    e.tick_transformations(&fw);

    assert_eq!(e.ki.current(), 0.5);
    assert!(!e.is_transformed(false));
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("end:Hungry"));
}

#[test]
fn test_timed_entry_through_full_ticks() {
    let (fw, log) = setup(KiConfig::default());
    let mut e = entity(&fw);

    assert_eq!(e.begin_transformation(&fw, &id("mod/Ascended")), TransformOutcome::Started);
    for _ in 0..59 {
        e.tick(&fw);
    }
    assert_eq!(e.transformations().phase(), TransformationPhase::Transforming);

    e.tick(&fw);
    assert_eq!(e.current_transformation(), Some(&id("mod/Ascended")));
    assert_eq!(*log.lock().unwrap(), vec!["post:Ascended"]);
}

#[test]
fn test_new_request_replaces_pending() {
    let (fw, _) = setup(KiConfig::default());
    let mut e = entity(&fw);

    e.begin_transformation(&fw, &id("mod/Ascended"));
    e.tick(&fw);
    assert_eq!(e.begin_transformation(&fw, &id("mod/SSJ")), TransformOutcome::Activated);

    assert!(e.pending_transformation().is_none());

    e.begin_transformation(&fw, &id("mod/Ascended"));
    e.tick(&fw);
    e.begin_transformation(&fw, &id("mod/Ascended"));
    assert_eq!(e.pending_transformation().unwrap().elapsed_ticks, 0);
    for _ in 0..60 {
        e.tick(&fw);
    }
    assert_eq!(e.current_transformation(), Some(&id("mod/Ascended")));
}

#[test]
fn test_zero_listeners_allow_everything() {
    let (fw, _) = setup(KiConfig::default());
    let e = entity(&fw);

    assert!(fw.events().can_transform.is_empty());
    assert!(fw.chain_visibility(&e, &id("mod/SaiyanForms")));
    assert!(fw.node_visibility(&e, &id("mod/SaiyanForms"), &id("mod/SSJ")));
    assert!(fw.can_see_transformation(&e, &id("mod/SSJ")));
}

#[test]
fn test_every_listener_runs_and_one_veto_wins() {
    let (mut fw, _) = setup(KiConfig::default());
    let calls = Arc::new(Mutex::new(0));
    for veto in [true, false, false] {
        let calls = Arc::clone(&calls);
        fw.events_mut().can_see_chain.subscribe(move |_, _, verdict| {
            *calls.lock().unwrap() += 1;
            if veto {
                verdict.veto();
            }
        });
    }

    let e = entity(&fw);
    assert!(!fw.chain_visibility(&e, &id("mod/SaiyanForms")));
    assert_eq!(*calls.lock().unwrap(), 3);
    assert!(fw.visible_chains(&e).is_empty());
    assert!(fw.visible_nodes(&e, &id("mod/SaiyanForms")).is_empty());
}

#[test]
fn test_node_visibility_predicate() {
    let log = Log::default();
    let mut fw = Framework::new(KiConfig::default()).unwrap();
    {
        let mut loader = fw.loader("mod").unwrap();
        let chain = loader.create_chain("Forms", always_visible()).unwrap();
        let a = loader.register_transformation("A", StatusHandle(1), Form::new("A", &log)).unwrap();
        let b = loader.register_transformation("B", StatusHandle(2), Form::new("B", &log)).unwrap();
        loader.enqueue_insertion(chain.clone(), a, always_visible(), InsertAt::End);
        loader.enqueue_insertion(
            chain,
            b,
            visibility(|entity| entity.ki.mastery_level() >= 5),
            InsertAt::End,
        );
    }
    fw.finalize();

    let mut e = entity(&fw);
    assert_eq!(fw.visible_nodes(&e, &id("mod/Forms")), vec![id("mod/A")]);

    e.ki.restore_mastery(5, 0.0);
    assert_eq!(fw.visible_nodes(&e, &id("mod/Forms")), vec![id("mod/A"), id("mod/B")]);
}

#[test]
fn test_finalize_twice_is_a_no_op() {
    let (mut fw, _) = setup(KiConfig::default());
    let report = fw.finalize();
    assert_eq!(report.applied, 0);
    let chain = fw.chains().get(&id("mod/SaiyanForms")).unwrap();
    assert_eq!(chain.nodes().len(), 2);
}

#[test]
fn test_duplicate_registration_leaves_registry_unchanged() {
    let log = Log::default();
    let mut fw = Framework::new(KiConfig::default()).unwrap();
    let mut loader = fw.loader("mod").unwrap();
    loader.register_transformation("SSJ", StatusHandle(1), Form::new("SSJ", &log)).unwrap();

    let result = loader.register_transformation("SSJ", StatusHandle(7), Form::new("SSJ", &log).stackable());
    assert!(matches!(result, Err(KiError::DuplicateKey { .. })));
    drop(loader);

    assert_eq!(fw.definitions().len(), 1);
    assert!(!fw.definitions().lookup_by_id(&id("mod/SSJ")).unwrap().is_stackable());
}

#[test]
fn test_spending_and_mastery_events() {
    let (mut fw, _) = setup(KiConfig::default());
    let changes: Arc<Mutex<Vec<KiChange>>> = Arc::default();
    let levels: Arc<Mutex<Vec<MasteryLevelUp>>> = Arc::default();
    {
        let changes = Arc::clone(&changes);
        fw.events_mut()
            .ki_change
            .subscribe(move |event| changes.lock().unwrap().push(event.clone()));
        let levels = Arc::clone(&levels);
        fw.events_mut()
            .mastery_level
            .subscribe(move |event| levels.lock().unwrap().push(event.clone()));
    }

    let mut e = entity(&fw);
    e.ki.mastery_rate = StatModifier::new(1000.0, 0.0);
    e.ki.add(-10.0, fw.events());

    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert!((changes[0].amount + 9.8).abs() < 1e-9);

    let levels = levels.lock().unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].previous_level, 1);
    assert_eq!(levels[0].current_level, 2);
    assert_eq!(e.ki.mastery_level(), 2);
}

#[test]
fn test_host_removal_and_reapply() {
    let (fw, log) = setup(KiConfig::default());
    let mut e = entity(&fw);
    e.begin_transformation(&fw, &id("mod/SSJ"));

    e.host_mut().remove_status(StatusHandle(1));
    e.tick(&fw);
    assert!(!e.is_transformed(true));
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("end:SSJ"));

    e.host_mut().apply_status(StatusHandle(2), 3);
    e.tick(&fw);
    assert_eq!(e.current_transformation(), Some(&id("mod/SSJ2")));
}

#[test]
fn test_kaioken_during_timed_entry() {
    let (fw, _) = setup(KiConfig::default());
    let mut e = entity(&fw);

    assert_eq!(e.begin_transformation(&fw, &id("mod/Ascended")), TransformOutcome::Started);
    e.tick(&fw);
    assert_eq!(e.begin_transformation(&fw, &id("mod/Kaioken")), TransformOutcome::Activated);

    for _ in 0..60 {
        e.tick(&fw);
    }
    assert_eq!(e.current_transformation(), Some(&id("mod/Ascended")));
    assert_eq!(e.stackable_transformations(), &[id("mod/Kaioken")]);
}

#[test]
fn test_save_load_round_trip_through_json() {
    let (fw, _) = setup(KiConfig::default());
    let mut e = entity(&fw);
    e.ki.restore_mastery(5, 12.5);
    e.selected_chain = Some(id("mod/SaiyanForms"));
    e.selected_transformation = Some(id("mod/SSJ2"));

    let mut store = FieldStore::new();
    e.save(&mut store);
    let text = serde_json::to_string(&store).unwrap();
    let store: FieldStore = serde_json::from_str(&text).unwrap();

    let mut restored = Entity::new(EntityHandle(2), fw.config(), MemoryHost::new());
    restored.load(&fw, &store).unwrap();
    restored.enter_world(&fw);

    assert_eq!(restored.ki.mastery_level(), 5);
    assert_eq!(restored.ki.max_capacity(), 110);
    assert_eq!(restored.transform_selected(&fw), TransformOutcome::Activated);
}

#[test]
fn test_config_from_json() {
    let config = KiConfig::from_json(r#"{"starting_ki": 250, "force_instant_transformations": true}"#).unwrap();
    let (fw, _) = setup(config);
    let mut e = entity(&fw);

    assert_eq!(e.ki.max_capacity(), 255);
    assert_eq!(e.begin_transformation(&fw, &id("mod/Ascended")), TransformOutcome::Activated);
}

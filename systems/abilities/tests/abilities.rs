use std::time::Duration;

use quiz_defence_core::{
    AbilityDefinition, AbilityId, Command, DamageField, Event, PlayerClass, ProgressionSnapshot,
    SessionPhase, StageDefinition, StageId, StageReward, TargetingStrategy, Timestamp, UnitKind,
    UnitTemplate,
};
use quiz_defence_system_abilities::{AbilityRejection, Abilities, Invocation};
use quiz_defence_world::{self as world, query, Setup, World};

fn skill(id: &str, cost: u32, multiplier: f64, strategy: TargetingStrategy) -> AbilityDefinition {
    AbilityDefinition {
        id: AbilityId::new(id),
        name: id.to_owned(),
        resource_cost: cost,
        multiplier,
        strategy,
    }
}

fn playing(units: usize) -> World {
    let stage = StageDefinition {
        id: StageId::new(1),
        name: "Field".to_owned(),
        description: String::new(),
        units: vec![
            UnitTemplate {
                kind: UnitKind::LightSwarm,
                health: 8,
                speed: 0.2,
                attack: 8,
                defense: 2,
            };
            units
        ],
        spawn_delays: vec![0.0; units],
        reward: StageReward::default(),
        offers_class_unlock: false,
    };
    // Warrior level 1: attack 5, resource 30.
    let progression = ProgressionSnapshot::new(PlayerClass::Warrior, 1);
    let mut world = World::new(Setup::new(&stage, &progression, 1));
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::EnterPhase {
            phase: SessionPhase::Playing,
        },
        &mut events,
    );
    for roster_index in 0..units {
        world::apply(&mut world, Command::SpawnUnit { roster_index }, &mut events);
    }
    world
}

fn use_ability(
    world: &mut World,
    abilities: &Abilities,
    id: &str,
    now: Timestamp,
) -> Result<(), AbilityRejection> {
    let id = AbilityId::new(id);
    let units = query::unit_view(world);
    let outcome = abilities.invoke(
        &id,
        Invocation {
            units: &units,
            attack: 5,
            level: 1,
            resource: query::player(world).resource,
            stunned: query::is_stunned(world, now),
            ready_at: query::cooldown_ready_at(world, &id),
            now,
        },
    )?;
    let mut events = Vec::new();
    for command in outcome.commands {
        world::apply(world, command, &mut events);
    }
    Ok(())
}

fn abilities() -> Abilities {
    Abilities::new(
        vec![
            skill("slash", 15, 2.0, TargetingStrategy::Single),
            skill("sweep", 20, 1.0, TargetingStrategy::All),
            skill("guard", 20, 1.0, TargetingStrategy::SelfShield),
            skill(
                "blizzard",
                25,
                1.2,
                TargetingStrategy::DamageField {
                    duration_frames: 300.0,
                    interval_frames: 60.0,
                    slows_units: true,
                },
            ),
        ],
        Duration::from_millis(3_000),
        0.3,
    )
}

#[test]
fn second_use_within_cooldown_is_rejected_without_mutation() {
    let mut world = playing(2);
    let abilities = abilities();

    use_ability(&mut world, &abilities, "slash", Timestamp::from_millis(100)).expect("accepted");
    let resource = query::player(&world).resource;
    let kills = query::kills(&world);
    assert_eq!(resource, 15);

    let rejection = use_ability(&mut world, &abilities, "slash", Timestamp::from_millis(3_099));
    assert!(matches!(rejection, Err(AbilityRejection::CoolingDown { .. })));
    assert_eq!(query::player(&world).resource, resource);
    assert_eq!(query::kills(&world), kills);

    use_ability(&mut world, &abilities, "slash", Timestamp::from_millis(3_100)).expect("ready");
    assert_eq!(query::player(&world).resource, 0);
}

#[test]
fn single_target_kill_scores_one_hundred_fifty() {
    let mut world = playing(1);
    use_ability(&mut world, &abilities(), "slash", Timestamp::ZERO).expect("accepted");

    assert_eq!(query::kills(&world), 1);
    assert_eq!(query::score(&world), 150);
}

#[test]
fn sweep_without_units_refunds_its_cost() {
    let mut world = playing(0);
    use_ability(&mut world, &abilities(), "sweep", Timestamp::ZERO).expect("accepted");

    assert_eq!(query::player(&world).resource, 30);
    assert_eq!(
        query::cooldown_ready_at(&world, &AbilityId::new("sweep")),
        Some(Timestamp::from_millis(3_000))
    );
}

#[test]
fn shield_grant_can_leave_too_little_for_a_field() {
    let mut world = playing(1);
    let abilities = abilities();
    let speed = query::unit_view(&world).into_vec()[0].speed;

    use_ability(&mut world, &abilities, "guard", Timestamp::ZERO).expect("accepted");
    assert_eq!(query::player(&world).shields, 1);

    let rejection = use_ability(&mut world, &abilities, "blizzard", Timestamp::ZERO);
    assert_eq!(
        rejection,
        Err(AbilityRejection::InsufficientResource {
            required: 25,
            available: 10
        })
    );
    assert!(query::field(&world).is_none());
    assert_eq!(query::unit_view(&world).into_vec()[0].speed, speed);
}

#[test]
fn a_new_field_replaces_the_active_one() {
    let mut world = playing(2);
    let mut abilities = abilities().definitions().to_vec();
    abilities.push(skill(
        "ember",
        5,
        2.0,
        TargetingStrategy::DamageField {
            duration_frames: 300.0,
            interval_frames: 30.0,
            slows_units: false,
        },
    ));
    let abilities = Abilities::new(abilities, Duration::from_millis(3_000), 0.3);

    use_ability(&mut world, &abilities, "blizzard", Timestamp::ZERO).expect("accepted");
    assert_eq!(query::player(&world).resource, 5);
    assert_eq!(query::field(&world), Some(DamageField::new(1, 300.0, 60.0)));
    let speeds: Vec<f64> = query::unit_view(&world).iter().map(|unit| unit.speed).collect();
    assert_eq!(speeds, vec![0.1, 0.1]);

    use_ability(&mut world, &abilities, "ember", Timestamp::ZERO).expect("accepted");
    assert_eq!(query::field(&world), Some(DamageField::new(3, 300.0, 30.0)));
    let speeds: Vec<f64> = query::unit_view(&world).iter().map(|unit| unit.speed).collect();
    assert_eq!(speeds, vec![0.1, 0.1]);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::AdvanceField {
            dt: Duration::from_millis(480),
        },
        &mut events,
    );
    assert_eq!(events, vec![Event::FieldPulsed { damage: 3 }]);
}

#[test]
fn abilities_are_blocked_while_stunned() {
    let mut world = playing(1);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::Stun {
            until: Timestamp::from_millis(2_000),
        },
        &mut events,
    );

    let rejection = use_ability(&mut world, &abilities(), "slash", Timestamp::from_millis(1_500));
    assert_eq!(rejection, Err(AbilityRejection::Stunned));
    assert_eq!(query::player(&world).resource, 30);
}

use std::time::Duration;

use quiz_defence_core::{
    AbilityDefinition, AbilityId, AllyProfile, EffectKind, EffectTarget, Feedback, Notification,
    PlayerClass, ProgressionSnapshot, Question, SessionPhase, StageDefinition, StageId,
    StageReward, TargetingStrategy, Timestamp, UnitKind, UnitTemplate,
};
use quiz_defence_session::{
    ActionRejected, CatalogData, InMemoryProgression, LoopControl, Session, SetupError, Tuning,
};
use quiz_defence_system_abilities::AbilityRejection;

const STAGE: StageId = StageId::new(1);

fn ms(millis: u64) -> Timestamp {
    Timestamp::from_millis(millis)
}

fn unit(health: u32, speed: f64, attack: u32, defense: u32) -> UnitTemplate {
    UnitTemplate {
        kind: UnitKind::LightSwarm,
        health,
        speed,
        attack,
        defense,
    }
}

fn stage(units: Vec<UnitTemplate>, spawn_delays: Vec<f64>) -> StageDefinition {
    StageDefinition {
        id: STAGE,
        name: "Training grounds".to_owned(),
        description: String::new(),
        units,
        spawn_delays,
        reward: StageReward {
            experience: 30,
            currency: 30,
            tickets: 1,
            egg_tickets: 0,
        },
        offers_class_unlock: false,
    }
}

fn deck() -> Vec<Question> {
    (0..3)
        .map(|index| Question {
            prompt: format!("Question {index}"),
            options: vec!["right".into(), "wrong".into(), "wrong".into(), "wrong".into()],
            answer: 0,
        })
        .collect()
}

fn player(attack: u32, health: u32, defense: u32) -> ProgressionSnapshot {
    let mut progression = ProgressionSnapshot::new(PlayerClass::Warrior, 1);
    progression.stats.attack = attack;
    progression.stats.health = health;
    progression.stats.defense = defense;
    progression
}

fn no_criticals() -> Tuning {
    Tuning {
        critical_chance: 0.0,
        ..Tuning::default()
    }
}

fn session(
    stage: StageDefinition,
    progression: ProgressionSnapshot,
    tuning: Tuning,
) -> Session<InMemoryProgression> {
    let catalog = CatalogData {
        stages: vec![stage],
        questions: deck(),
    };
    let mut session = Session::new(InMemoryProgression::new(progression), tuning, 42);
    session
        .select_stage(&catalog, &catalog, STAGE)
        .expect("stage is playable");
    session
}

fn unit_health(session: &Session<InMemoryProgression>, now: Timestamp) -> Vec<u32> {
    session
        .snapshot(now)
        .units
        .iter()
        .map(|unit| unit.health)
        .collect()
}

#[test]
fn three_correct_answers_clear_the_stage_and_pay_once() {
    let mut session = session(
        stage(vec![unit(1, 0.1, 5, 0); 3], vec![0.0, 0.0, 0.0]),
        player(10, 20, 0),
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");
    assert_eq!(session.snapshot(ms(0)).units.len(), 3);

    for (answer, at) in [100, 200, 300].into_iter().enumerate() {
        assert_eq!(session.submit_answer(0, ms(at)), Ok(true), "answer {answer}");
    }
    assert_eq!(session.phase(), SessionPhase::Clearing);
    assert_eq!(session.snapshot(ms(300)).kills, 3);

    assert_eq!(session.tick(ms(2_299)), LoopControl::Continue);
    assert_eq!(session.phase(), SessionPhase::Clearing);
    assert!(session.store().rewards().is_empty());

    assert_eq!(session.tick(ms(2_300)), LoopControl::Stop);
    assert_eq!(session.phase(), SessionPhase::Clear);
    assert_eq!(session.tick(ms(5_000)), LoopControl::Stop);

    let store = session.store();
    assert_eq!(store.rewards().len(), 1);
    assert_eq!(store.currency(), 30);
    assert_eq!(store.experience(), 30);
    assert_eq!(store.tickets(), 1);

    let cleared: Vec<_> = session
        .drain_notifications()
        .into_iter()
        .filter_map(|notification| match notification {
            Notification::StageCleared(reward) => Some(reward),
            _ => None,
        })
        .collect();
    assert_eq!(cleared.len(), 1);
    assert!(cleared[0].first_clear);
    assert_eq!(cleared[0].kills, 3);
}

#[test]
fn lethal_contact_clamps_health_and_ends_the_attempt() {
    let mut session = session(
        stage(vec![unit(100, 10.0, 15, 0)], vec![0.0]),
        player(1, 10, 0),
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");

    assert_eq!(session.tick(ms(144)), LoopControl::Stop);

    let snapshot = session.snapshot(ms(144));
    assert_eq!(snapshot.phase, SessionPhase::GameOver);
    assert_eq!(snapshot.player.map(|player| player.health), Some(0));
    assert!(session
        .drain_notifications()
        .iter()
        .any(|notification| matches!(
            notification,
            Notification::StageFailed { stage, .. } if *stage == STAGE
        )));
    assert!(session.store().rewards().is_empty());
}

#[test]
fn wrong_answer_stun_blocks_damage_for_two_seconds() {
    let mut session = session(
        stage(vec![unit(100, 0.0, 5, 0)], vec![0.0]),
        player(10, 20, 0),
        no_criticals(),
    );
    session.start(ms(0)).expect("attempt starts");

    assert_eq!(session.submit_answer(1, ms(1_000)), Ok(false));
    assert_eq!(session.snapshot(ms(1_000)).question_index, 1);
    assert_eq!(
        session.snapshot(ms(1_500)).stun_remaining,
        Duration::from_millis(1_500)
    );

    assert_eq!(
        session.submit_answer(0, ms(2_999)),
        Err(ActionRejected::Stunned)
    );
    assert_eq!(unit_health(&session, ms(2_999)), vec![100]);
    assert_eq!(session.snapshot(ms(2_999)).question_index, 1);

    assert_eq!(session.submit_answer(0, ms(3_000)), Ok(true));
    assert_eq!(unit_health(&session, ms(3_000)), vec![90]);
    assert_eq!(session.submit_answer(0, ms(3_100)), Ok(true));
    assert_eq!(unit_health(&session, ms(3_100)), vec![80]);
}

#[test]
fn repeated_timestamps_change_nothing() {
    let mut session = session(
        stage(vec![unit(50, 0.5, 5, 0); 2], vec![0.0, 5.0]),
        player(10, 20, 0),
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");
    let _ = session.tick(ms(64));
    let before = session.snapshot(ms(64));

    let _ = session.tick(ms(64));
    let _ = session.tick(ms(64));

    assert_eq!(session.snapshot(ms(64)), before);
    assert_eq!(before.units.len(), 1);
}

#[test]
fn cooldown_rejects_a_second_use_without_mutation() {
    let mut progression = player(10, 20, 0);
    progression.abilities.push(AbilityDefinition {
        id: AbilityId::new("w_slash"),
        name: "Power slash".to_owned(),
        resource_cost: 10,
        multiplier: 2.0,
        strategy: TargetingStrategy::Single,
    });
    let mut session = session(
        stage(vec![unit(100, 0.0, 5, 0)], vec![0.0]),
        progression,
        no_criticals(),
    );
    session.start(ms(0)).expect("attempt starts");
    let id = AbilityId::new("w_slash");

    session.use_ability(&id, ms(500)).expect("first use");
    let after_first = session.snapshot(ms(500));
    assert_eq!(after_first.player.map(|player| player.resource), Some(20));
    assert_eq!(unit_health(&session, ms(500)), vec![80]);

    let rejection = session.use_ability(&id, ms(3_499));
    assert!(matches!(
        rejection,
        Err(ActionRejected::Ability(AbilityRejection::CoolingDown { .. }))
    ));
    let mut after_rejection = session.snapshot(ms(3_499));
    after_rejection.cooldowns = after_first.cooldowns.clone();
    after_rejection.stun_remaining = after_first.stun_remaining;
    assert_eq!(after_rejection, after_first);

    session.use_ability(&id, ms(3_500)).expect("cooled down");
    assert_eq!(unit_health(&session, ms(3_500)), vec![60]);
}

#[test]
fn attempt_invariants_hold_for_every_tick() {
    let stage = stage(
        vec![
            unit(8, 0.07, 8, 2),
            unit(8, 0.06, 8, 2),
            unit(5, 0.12, 6, 1),
            unit(10, 0.07, 10, 3),
            unit(10, 0.065, 10, 3),
            unit(6, 0.13, 7, 1),
            UnitTemplate {
                kind: UnitKind::HeavyTank,
                ..unit(25, 0.035, 14, 8)
            },
        ],
        vec![0.0, 80.0, 160.0, 300.0, 400.0, 520.0, 700.0],
    );
    let mut progression = ProgressionSnapshot::new(PlayerClass::Warrior, 5);
    progression.unlocked_classes = vec![PlayerClass::Warrior];
    let mut session = session(stage, progression, Tuning::default());
    session.start(ms(0)).expect("attempt starts");

    let mut previous_kills = 0;
    let mut now = 0;
    while now < 60_000 {
        now += 16;
        if now % 256 == 0 {
            let _ = session.submit_answer(0, ms(now));
        }
        let control = session.tick(ms(now));

        let snapshot = session.snapshot(ms(now));
        let player = snapshot.player.expect("attempt is running");
        assert!(player.health <= player.max_health);
        for unit in &snapshot.units {
            assert!(unit.health > 0, "defeated units leave the live set");
            assert!((0.0..=100.0).contains(&unit.position));
        }
        assert!(snapshot.kills >= previous_kills);
        previous_kills = snapshot.kills;
        if snapshot.phase == SessionPhase::Playing {
            assert!(snapshot.kills < snapshot.total_units);
        } else if matches!(snapshot.phase, SessionPhase::Clearing | SessionPhase::Clear) {
            assert_eq!(snapshot.kills, snapshot.total_units);
        }

        if control == LoopControl::Stop {
            break;
        }
    }

    assert_eq!(session.phase(), SessionPhase::Clear);
    assert_eq!(session.store().rewards().len(), 1);
}

#[test]
fn retry_after_game_over_resets_the_attempt() {
    let mut session = session(
        stage(vec![unit(100, 10.0, 15, 0)], vec![0.0]),
        player(1, 10, 0),
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");
    assert_eq!(
        session.start(ms(10)),
        Err(SetupError::InvalidTransition {
            from: SessionPhase::Playing,
            to: SessionPhase::Playing
        })
    );
    let _ = session.tick(ms(144));
    assert_eq!(session.phase(), SessionPhase::GameOver);
    assert_eq!(session.submit_answer(0, ms(150)), Err(ActionRejected::NotPlaying));

    session.start(ms(200)).expect("retry");
    let snapshot = session.snapshot(ms(200));
    assert_eq!(snapshot.phase, SessionPhase::Playing);
    assert_eq!(snapshot.player.map(|player| player.health), Some(10));
    assert_eq!(snapshot.kills, 0);
    assert_eq!(snapshot.units.len(), 1);
    assert_eq!(snapshot.units[0].position, 0.0);

    session.leave();
    assert_eq!(session.phase(), SessionPhase::Standby);
    assert_eq!(session.tick(ms(300)), LoopControl::Stop);
}

#[test]
fn unplayable_catalogs_never_start_an_attempt() {
    let playable = stage(vec![unit(1, 0.1, 1, 0)], vec![0.0]);
    let mut session = Session::new(
        InMemoryProgression::new(player(10, 10, 0)),
        Tuning::default(),
        1,
    );
    assert_eq!(session.start(ms(0)), Err(SetupError::NoStageSelected));

    let no_questions = CatalogData {
        stages: vec![playable.clone()],
        questions: Vec::new(),
    };
    assert_eq!(
        session.select_stage(&no_questions, &no_questions, STAGE),
        Err(SetupError::NoQuestions)
    );
    assert_eq!(
        session.select_stage(&no_questions, &no_questions, StageId::new(9)),
        Err(SetupError::StageNotFound(StageId::new(9)))
    );

    let empty = CatalogData {
        stages: vec![stage(Vec::new(), Vec::new())],
        questions: deck(),
    };
    assert_eq!(
        session.select_stage(&empty, &empty, STAGE),
        Err(SetupError::EmptyRoster(STAGE))
    );

    let mut broken = deck();
    broken[2].answer = 7;
    let bad_deck = CatalogData {
        stages: vec![playable],
        questions: broken,
    };
    assert_eq!(
        session.select_stage(&bad_deck, &bad_deck, STAGE),
        Err(SetupError::InvalidQuestion(2))
    );
    assert_eq!(session.phase(), SessionPhase::Standby);
    assert!(session.stage().is_none());
}

#[test]
fn quick_start_defeats_opening_units_after_its_delay() {
    let mut progression = player(1, 20, 0);
    progression.equipment.quick_kill_potency = 250;
    let mut session = session(
        stage(vec![unit(40, 0.0, 5, 0); 3], vec![0.0; 3]),
        progression,
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");

    let _ = session.tick(ms(496));
    assert_eq!(session.snapshot(ms(496)).kills, 0);
    let _ = session.tick(ms(512));

    let snapshot = session.snapshot(ms(512));
    assert_eq!(snapshot.kills, 2);
    assert_eq!(snapshot.score, 200);
    assert!(session
        .drain_notifications()
        .contains(&Notification::Feedback(Feedback::QuickStart { kills: 2 })));
}

#[test]
fn ally_strikes_the_front_unit_on_its_interval() {
    let mut progression = player(1, 20, 0);
    progression.ally = Some(AllyProfile {
        name: "Owl".to_owned(),
        attack: 12,
        interval_secs: 1.0,
    });
    let mut session = session(
        stage(vec![unit(30, 0.1, 5, 2), unit(30, 0.2, 5, 2)], vec![0.0, 0.0]),
        progression,
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");

    let mut now = 0;
    while now < 992 {
        now += 16;
        let _ = session.tick(ms(now));
    }
    assert_eq!(unit_health(&session, ms(now)), vec![30, 30]);

    let _ = session.tick(ms(1_008));
    assert_eq!(unit_health(&session, ms(1_008)), vec![30, 20]);
    assert!(session.drain_notifications().iter().any(|notification| matches!(
        notification,
        Notification::Effect(effect)
            if effect.kind == EffectKind::Magic && effect.level_scale == 1
    )));
}

#[test]
fn primary_attack_plays_the_class_effect_on_its_target() {
    let mut progression = ProgressionSnapshot::new(PlayerClass::Mage, 1);
    progression.unlocked_classes = vec![PlayerClass::Mage];
    let mut session = session(
        stage(vec![unit(100, 0.0, 5, 0)], vec![0.0]),
        progression,
        no_criticals(),
    );
    session.start(ms(0)).expect("attempt starts");
    let _ = session.drain_notifications();

    assert_eq!(session.submit_answer(0, ms(10)), Ok(true));

    let notifications = session.drain_notifications();
    assert_eq!(
        notifications[0],
        Notification::Feedback(Feedback::CorrectAnswer)
    );
    let Notification::Effect(effect) = &notifications[1] else {
        panic!("expected an effect, got {:?}", notifications[1]);
    };
    assert_eq!(effect.kind, EffectKind::Magic);
    assert!(matches!(effect.target, EffectTarget::Unit(_)));
    assert_eq!(effect.damage, 8);
    assert!(!effect.critical);
}

fn field_skill(id: &str, multiplier: f64, interval_frames: f64, slows_units: bool) -> AbilityDefinition {
    AbilityDefinition {
        id: AbilityId::new(id),
        name: id.to_owned(),
        resource_cost: 10,
        multiplier,
        strategy: TargetingStrategy::DamageField {
            duration_frames: 600.0,
            interval_frames,
            slows_units,
        },
    }
}

#[test]
fn ally_strikes_before_a_field_pulse_on_the_same_tick() {
    let mut progression = player(10, 20, 0);
    progression.abilities.push(field_skill("embers", 1.0, 62.5, false));
    progression.ally = Some(AllyProfile {
        name: "Owl".to_owned(),
        attack: 5,
        interval_secs: 1.0,
    });
    let mut session = session(
        stage(vec![unit(3, 0.0, 5, 0), unit(100, 0.0, 5, 0)], vec![0.0, 0.0]),
        progression,
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");
    session
        .use_ability(&AbilityId::new("embers"), ms(0))
        .expect("field deployed");

    let mut now = 0;
    while now < 980 {
        now += 20;
        let _ = session.tick(ms(now));
    }
    assert_eq!(unit_health(&session, ms(now)), vec![3, 100]);

    let _ = session.tick(ms(1_000));
    let snapshot = session.snapshot(ms(1_000));
    assert_eq!(snapshot.kills, 1);
    assert_eq!(snapshot.score, 100);
    assert_eq!(unit_health(&session, ms(1_000)), vec![97]);
}

#[test]
fn slowing_field_halves_live_units_but_not_later_arrivals() {
    let mut progression = player(10, 20, 0);
    progression.abilities.push(field_skill("blizzard", 1.0, 60.0, true));
    let mut session = session(
        stage(
            vec![unit(50, 0.4, 5, 0), unit(50, 0.2, 5, 0), unit(50, 0.4, 5, 0)],
            vec![0.0, 0.0, 10.0],
        ),
        progression,
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");
    session
        .use_ability(&AbilityId::new("blizzard"), ms(0))
        .expect("field deployed");

    let snapshot = session.snapshot(ms(0));
    assert_eq!(snapshot.player.map(|player| player.resource), Some(20));
    assert!(snapshot.field.is_some());
    let speeds: Vec<f64> = snapshot.units.iter().map(|unit| unit.speed).collect();
    assert_eq!(speeds, vec![0.2, 0.1]);

    let _ = session.tick(ms(160));
    let speeds: Vec<f64> = session
        .snapshot(ms(160))
        .units
        .iter()
        .map(|unit| unit.speed)
        .collect();
    assert_eq!(speeds, vec![0.2, 0.1, 0.4]);
}

#[test]
fn units_move_on_the_tick_that_releases_them() {
    let mut session = session(
        stage(vec![unit(50, 0.5, 5, 0); 2], vec![0.0, 4.0]),
        player(10, 20, 0),
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");

    let _ = session.tick(ms(64));

    let positions: Vec<f64> = session
        .snapshot(ms(64))
        .units
        .iter()
        .map(|unit| unit.position)
        .collect();
    assert_eq!(positions, vec![2.0, 2.0]);
}

#[test]
fn contact_and_quick_start_effects_use_fixed_scales() {
    let mut progression = player(1, 20, 0);
    progression.level = 5;
    progression.equipment.quick_kill_potency = 100;
    let mut session = session(
        stage(vec![unit(40, 0.0, 5, 0), unit(100, 10.0, 3, 0)], vec![0.0, 0.0]),
        progression,
        Tuning::default(),
    );
    session.start(ms(0)).expect("attempt starts");
    let _ = session.drain_notifications();

    let _ = session.tick(ms(144));
    let contact = session
        .drain_notifications()
        .into_iter()
        .find_map(|notification| match notification {
            Notification::Effect(effect) if effect.target == EffectTarget::Player => Some(effect),
            _ => None,
        })
        .expect("contact plays an effect on the player");
    assert_eq!(contact.kind, EffectKind::Slash);
    assert_eq!(contact.level_scale, 1);
    assert_eq!(contact.damage, 3);
    assert!(contact.critical);

    let _ = session.tick(ms(512));
    assert_eq!(session.snapshot(ms(512)).kills, 1);
    let coin = session
        .drain_notifications()
        .into_iter()
        .find_map(|notification| match notification {
            Notification::Effect(effect) if effect.kind == EffectKind::Coin => Some(effect),
            _ => None,
        })
        .expect("quick start plays a coin effect");
    assert_eq!(coin.level_scale, 2);
    assert!(coin.critical);
}

//! Strain evaluation over a whole chart, its prefixes and resolved outcomes

use crate::beatmap::{approach_rate_from_preempt, total_combo, BeatmapRecord, GameMode, HitObject};
use crate::error::{Error, Result};
use crate::mods::Mods;
use crate::resolve::AnnotatedHitObject;

use super::config::StrainConfig;
use super::difficulty_object::{build_difficulty_objects, DifficultyObject};
use super::skills::{speed_note_count, weighted_difficulty, SkillKind, SkillRun, StrainSkill};
use super::{DifficultyAttributes, SkillStrains, StrainPeak, StrainSequence};

/// Most strain sections a single chart may be split into
const MAX_STRAIN_SECTIONS: f64 = (1u64 << 24) as f64;

/// Strain peaks of a chart together with the section each object fell into
#[derive(Debug, Clone)]
pub struct ChartStrains {
    pub sequence: StrainSequence,
    pub attributes: DifficultyAttributes,
    mods: Mods,
    /// Section index per difficulty object (hit object index minus one)
    aim_sections: Option<Vec<usize>>,
    speed_sections: Vec<usize>,
    flashlight_sections: Option<Vec<usize>>,
}

/// Derived values that come from skill runs rather than peaks alone
#[derive(Debug, Clone, Copy)]
struct SkillExtras {
    slider_strain_ratio: f64,
    speed_note_count: f64,
}

/// Reject configurations that would split `beatmap` into too many sections.
pub fn check_section_count(beatmap: &BeatmapRecord, mods: Mods, config: &StrainConfig) -> Result<()> {
    let (Some(first), Some(last)) = (beatmap.hit_objects.first(), beatmap.hit_objects.last()) else {
        return Ok(());
    };
    let span = (last.start_time - first.start_time) / mods.clock_rate();
    let sections = span / config.section_length + 1.0;
    if sections > MAX_STRAIN_SECTIONS {
        return Err(Error::Config(format!(
            "section_length {} splits the chart into {:.0} sections, more than {}",
            config.section_length, sections, MAX_STRAIN_SECTIONS
        )));
    }
    Ok(())
}

/// Evaluate every skill over the whole chart.
///
/// Skills run concurrently; osu!taiko, osu!catch and osu!mania only evaluate
/// speed.
pub fn compute_chart(beatmap: &BeatmapRecord, mods: Mods, config: &StrainConfig) -> ChartStrains {
    let objects = build_difficulty_objects(beatmap, mods, config.min_strain_time);
    let section_length = config.section_length;

    let (standard, speed) = if beatmap.mode == GameMode::Osu {
        let ((aim, aim_no_sliders), (speed, flashlight)) = rayon::join(
            || {
                rayon::join(
                    || run_skill(StrainSkill::new(SkillKind::Aim, config.aim, section_length), &objects),
                    || run_skill(StrainSkill::aim_without_sliders(config.aim, section_length), &objects),
                )
            },
            || {
                rayon::join(
                    || run_skill(StrainSkill::new(SkillKind::Speed, config.speed, section_length), &objects),
                    || {
                        run_skill(
                            StrainSkill::new(SkillKind::Flashlight, config.flashlight, section_length),
                            &objects,
                        )
                    },
                )
            },
        );
        (Some((aim, aim_no_sliders, flashlight)), speed)
    } else {
        let speed = run_skill(
            StrainSkill::new(SkillKind::Speed, config.speed, section_length),
            &objects,
        );
        (None, speed)
    };

    let aim_no_sliders_peaks = standard.as_ref().map(|(_, no_sliders, _)| no_sliders.peaks.as_slice());
    let extras = skill_extras(
        standard.as_ref().map(|(aim, _, _)| aim.peaks.as_slice()),
        aim_no_sliders_peaks,
        &speed.object_strains,
        config,
    );

    let (aim, flashlight) = match standard {
        Some((aim, _, flashlight)) => (Some(aim), Some(flashlight)),
        None => (None, None),
    };
    let aim_sections = aim.as_ref().map(|run| run.object_sections.clone());
    let flashlight_sections = flashlight.as_ref().map(|run| run.object_sections.clone());

    let sequence = sequence_from(
        aim.map(|run| skill_strains(SkillKind::Aim, run.peaks, config)),
        skill_strains(SkillKind::Speed, speed.peaks, config),
        flashlight.map(|run| skill_strains(SkillKind::Flashlight, run.peaks, config)),
        mods,
        config,
    );
    let attributes = difficulty_attributes(beatmap, &beatmap.hit_objects, mods, &sequence, extras);

    tracing::debug!(
        objects = objects.len(),
        sections = sequence.speed.peaks.len(),
        stars = sequence.stars,
        "Computed chart strains"
    );

    ChartStrains {
        sequence,
        attributes,
        mods,
        aim_sections,
        speed_sections: speed.object_sections,
        flashlight_sections,
    }
}

/// Re-weight each section peak by the mean outcome credit of its objects.
///
/// Sections without annotated objects keep their peak.
pub fn adjust_sequence(
    chart: &ChartStrains,
    annotations: &[AnnotatedHitObject],
    config: &StrainConfig,
) -> StrainSequence {
    let reweight = |strains: &SkillStrains, sections: &[usize]| {
        let peaks = reweight_peaks(&strains.peaks, sections, annotations, config);
        skill_strains(strains.kind, peaks, config)
    };

    let aim = chart
        .sequence
        .aim
        .as_ref()
        .zip(chart.aim_sections.as_deref())
        .map(|(strains, sections)| reweight(strains, sections));
    let speed = reweight(&chart.sequence.speed, &chart.speed_sections);
    let flashlight = chart
        .sequence
        .flashlight
        .as_ref()
        .zip(chart.flashlight_sections.as_deref())
        .map(|(strains, sections)| reweight(strains, sections));

    sequence_from(aim, speed, flashlight, chart.mods, config)
}

/// Difficulty after each hit object, computed from the chart prefix.
pub fn gradual_difficulty(
    beatmap: &BeatmapRecord,
    mods: Mods,
    config: &StrainConfig,
) -> Vec<DifficultyAttributes> {
    let objects = build_difficulty_objects(beatmap, mods, config.min_strain_time);
    let standard = beatmap.mode == GameMode::Osu;
    let section_length = config.section_length;

    let mut aim = StrainSkill::new(SkillKind::Aim, config.aim, section_length);
    let mut aim_no_sliders = StrainSkill::aim_without_sliders(config.aim, section_length);
    let mut speed = StrainSkill::new(SkillKind::Speed, config.speed, section_length);
    let mut flashlight = StrainSkill::new(SkillKind::Flashlight, config.flashlight, section_length);
    let mut gradual = Vec::with_capacity(beatmap.hit_objects.len());

    for i in 0..beatmap.hit_objects.len() {
        if let Some(object) = i.checked_sub(1).and_then(|k| objects.get(k)) {
            if standard {
                aim.process(object);
                aim_no_sliders.process(object);
                flashlight.process(object);
            }
            speed.process(object);
        }

        let aim_peaks = standard.then(|| aim.peaks_with_current());
        let aim_no_sliders_peaks = standard.then(|| aim_no_sliders.peaks_with_current());
        let extras = skill_extras(
            aim_peaks.as_deref(),
            aim_no_sliders_peaks.as_deref(),
            speed.object_strains(),
            config,
        );

        let sequence = sequence_from(
            aim_peaks.map(|peaks| skill_strains(SkillKind::Aim, peaks, config)),
            skill_strains(SkillKind::Speed, speed.peaks_with_current(), config),
            standard.then(|| {
                skill_strains(SkillKind::Flashlight, flashlight.peaks_with_current(), config)
            }),
            mods,
            config,
        );

        gradual.push(difficulty_attributes(
            beatmap,
            &beatmap.hit_objects[..=i],
            mods,
            &sequence,
            extras,
        ));
    }

    gradual
}

fn run_skill(mut skill: StrainSkill, objects: &[DifficultyObject]) -> SkillRun {
    for object in objects {
        skill.process(object);
    }
    skill.finish()
}

fn skill_extras(
    aim_peaks: Option<&[StrainPeak]>,
    aim_no_sliders_peaks: Option<&[StrainPeak]>,
    speed_object_strains: &[f64],
    config: &StrainConfig,
) -> SkillExtras {
    let rating = |peaks: &[StrainPeak]| {
        weighted_difficulty(peaks, config.decay_weight, config.top_peaks).sqrt()
            * config.difficulty_multiplier
    };

    let slider_strain_ratio = match (aim_peaks.map(rating), aim_no_sliders_peaks.map(rating)) {
        (Some(aim), Some(no_sliders)) if aim > 0.0 => no_sliders / aim,
        _ => 1.0,
    };

    SkillExtras {
        slider_strain_ratio,
        speed_note_count: speed_note_count(speed_object_strains),
    }
}

fn reweight_peaks(
    peaks: &[StrainPeak],
    sections: &[usize],
    annotations: &[AnnotatedHitObject],
    config: &StrainConfig,
) -> Vec<StrainPeak> {
    let mut credit = vec![(0.0, 0u32); peaks.len()];
    for annotation in annotations {
        let section = annotation
            .index
            .checked_sub(1)
            .and_then(|k| sections.get(k))
            .copied();
        if let Some(entry) = section.and_then(|s| credit.get_mut(s)) {
            entry.0 += config.outcome_credit.of(annotation.result);
            entry.1 += 1;
        }
    }

    peaks
        .iter()
        .zip(&credit)
        .map(|(peak, &(sum, count))| StrainPeak {
            time: peak.time,
            strain: if count > 0 {
                peak.strain * (sum / f64::from(count))
            } else {
                peak.strain
            },
        })
        .collect()
}

fn skill_strains(kind: SkillKind, peaks: Vec<StrainPeak>, config: &StrainConfig) -> SkillStrains {
    let difficulty = match kind {
        // Flashlight difficulty accumulates over the whole chart
        SkillKind::Flashlight => {
            weighted_difficulty(&peaks, config.flashlight_decay_weight, usize::MAX)
        }
        SkillKind::Aim | SkillKind::Speed => {
            weighted_difficulty(&peaks, config.decay_weight, config.top_peaks)
        }
    };
    SkillStrains {
        kind,
        peaks,
        difficulty,
        rating: difficulty.sqrt() * config.difficulty_multiplier,
    }
}

fn sequence_from(
    aim: Option<SkillStrains>,
    speed: SkillStrains,
    flashlight: Option<SkillStrains>,
    mods: Mods,
    config: &StrainConfig,
) -> StrainSequence {
    let aim_rating = aim.as_ref().map_or(0.0, |a| a.rating);
    let flashlight_rating = flashlight
        .as_ref()
        .filter(|_| mods.contains(Mods::FLASHLIGHT))
        .map(|f| f.rating);
    let stars = star_rating(aim_rating, speed.rating, flashlight_rating, config);
    StrainSequence {
        aim,
        speed,
        flashlight,
        stars,
    }
}

/// Convert a skill rating to the performance scale it is combined on.
pub(crate) fn base_performance(rating: f64, difficulty_multiplier: f64) -> f64 {
    (5.0 * (rating / difficulty_multiplier).max(1.0) - 4.0).powi(3) / 100_000.0
}

/// Flashlight counterpart of [`base_performance`].
pub(crate) fn base_flashlight_performance(rating: f64) -> f64 {
    rating.powi(2) * 25.0
}

/// Combine skill ratings with a power mean on the performance scale.
///
/// Flashlight only contributes when given, i.e. when the mod is active.
pub(crate) fn star_rating(
    aim: f64,
    speed: f64,
    flashlight: Option<f64>,
    config: &StrainConfig,
) -> f64 {
    if aim <= 0.0 && speed <= 0.0 && flashlight.map_or(true, |f| f <= 0.0) {
        return 0.0;
    }

    let p = config.star_exponent;
    let base_aim = base_performance(aim, config.difficulty_multiplier);
    let base_speed = base_performance(speed, config.difficulty_multiplier);
    let base_flashlight = flashlight.map_or(0.0, base_flashlight_performance);
    let base = (base_aim.powf(p) + base_speed.powf(p) + base_flashlight.powf(p)).powf(1.0 / p);

    if base > 1e-5 {
        1.12_f64.cbrt() * 0.027 * ((100_000.0 / 2.0_f64.powf(1.0 / p) * base).cbrt() + 4.0)
    } else {
        0.0
    }
}

fn difficulty_attributes(
    beatmap: &BeatmapRecord,
    objects: &[HitObject],
    mods: Mods,
    sequence: &StrainSequence,
    extras: SkillExtras,
) -> DifficultyAttributes {
    let clock_rate = mods.clock_rate();
    let difficulty = beatmap.difficulty.with_mods(mods);

    let ar = approach_rate_from_preempt(difficulty.preempt() / clock_rate);
    let great_window = difficulty.hit_windows().great / clock_rate;
    let od = (80.0 - great_window) / 6.0;

    DifficultyAttributes {
        mode: beatmap.mode,
        aim: sequence.aim.as_ref().map_or(0.0, |a| a.rating),
        speed: sequence.speed.rating,
        flashlight: sequence.flashlight.as_ref().map_or(0.0, |f| f.rating),
        slider_strain_ratio: extras.slider_strain_ratio,
        speed_note_count: extras.speed_note_count,
        stars: sequence.stars,
        ar,
        od,
        hp: f64::from(difficulty.hp_drain),
        cs: f64::from(difficulty.circle_size),
        clock_rate,
        n_circles: objects.iter().filter(|h| h.is_circle()).count() as u32,
        n_sliders: objects.iter().filter(|h| h.is_slider()).count() as u32,
        n_spinners: objects.iter().filter(|h| h.is_spinner()).count() as u32,
        max_combo: u32::try_from(total_combo(objects)).unwrap_or(u32::MAX),
    }
}

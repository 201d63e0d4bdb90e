use crate::scene::{ResolvedScene, SubtitleCue};

/// One cue per narrated scene, laid end to end in input order. Returns the
/// cues and the total frame count of the whole sequence.
pub fn build_subtitles(scenes: &[ResolvedScene]) -> (Vec<SubtitleCue>, u32) {
    let mut cues = Vec::new();
    let mut offset: u32 = 0;
    for scene in scenes {
        let end = offset.saturating_add(scene.duration_in_frames);
        if let Some(caption) = scene.caption() {
            cues.push(SubtitleCue {
                text: caption.to_string(),
                start_frame: offset,
                end_frame: end,
            });
        }
        offset = end;
    }
    (cues, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{PropertyBag, SceneKind};

    fn scene(frames: u32, text: Option<&str>) -> ResolvedScene {
        ResolvedScene {
            kind: SceneKind::KineticText,
            duration_in_frames: frames,
            text: text.map(String::from),
            audio: None,
            title: None,
            subtitle: None,
            points: Vec::new(),
            items: Vec::new(),
            transition: None,
            media: None,
            props: PropertyBag::new(),
        }
    }

    #[test]
    fn cues_follow_cumulative_offsets() {
        let scenes = [
            scene(90, Some("one")),
            scene(60, None),
            scene(30, Some("  three ")),
        ];
        let (cues, total) = build_subtitles(&scenes);

        assert_eq!(total, 180);
        assert_eq!(cues.len(), 2);
        assert_eq!((cues[0].start_frame, cues[0].end_frame), (0, 90));
        assert_eq!(cues[1].text, "three");
        assert_eq!((cues[1].start_frame, cues[1].end_frame), (150, 180));
    }

    #[test]
    fn empty_input_has_no_frames() {
        let (cues, total) = build_subtitles(&[]);
        assert!(cues.is_empty());
        assert_eq!(total, 0);
    }
}

use anyhow::Result;
use nalgebra::{Translation3, UnitQuaternion, Vector3};
use rs_traj_edit::editor::{ExportMode, TrajectoryEditor};
use rs_traj_edit::trajectory::Pose;
use rs_traj_edit::utils::{dump_joints, dump_pose};

/// Usage example.
fn main() -> Result<()> {
    // A short base trajectory: base pose x,y,z + quaternion, then two joints.
    let csv = "\
# demo walk, 2 joints
0.0,0.0,1.0,0,0,0,1,0.10,0.20
0.2,0.0,1.0,0,0,0,1,0.15,0.25
0.4,0.0,1.0,0,0,0,1,0.20,0.30
0.6,0.0,1.0,0,0,0,1,0.25,0.35
0.8,0.0,1.0,0,0,0,1,0.30,0.40
";
    let mut editor = TrajectoryEditor::from_csv(csv);
    println!(
        "Loaded {} frames with {} joints each",
        editor.frame_count(),
        editor.joint_count()
    );

    // Author a correction at frame 1 and another at frame 3. Values are what
    // the user wants to see; residuals are derived against the base.
    editor.add_keyframe(1, &[0.25, 0.25], None)?;
    let tilted = Pose::from_parts(
        Translation3::new(0.65, 0.05, 1.0),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3),
    );
    editor.add_keyframe(3, &[0.45, 0.55], Some(&tilted))?;

    println!("Combined states (base + interpolated residual):");
    for frame in 0..editor.frame_count() {
        let state = editor.combined_state(frame).expect("frame within range");
        print!("frame {}: ", frame);
        dump_joints(&state.joints);
        dump_pose(&state.base);
    }

    // Frames before the first keyframe are untouched, frames after the last
    // hold its correction.
    println!("Joint residual at frame 0: {:?}", editor.joint_residual(0));
    println!("Joint residual at frame 4: {:?}", editor.joint_residual(4));

    // Smoothing needs three contiguous keyframes; author one more in between.
    editor.add_keyframe(2, &[0.9, 0.9], None)?;
    editor.smooth_range(&[1, 2, 3])?;
    println!("After smoothing, frame 2 lies on the path between 1 and 3:");
    dump_joints(&editor.combined_state(2).expect("frame within range").joints);

    #[cfg(feature = "support_analysis")]
    {
        use nalgebra::{Isometry3, Point3};
        use rs_traj_edit::balance::{apply_as_residual, solve, AxisChoice};
        use rs_traj_edit::body::{SimpleBody, SimpleLink};
        use rs_traj_edit::support::analyze;

        // A crude posed body: a heavy torso above a flat foot plate.
        let mut body = SimpleBody::default();
        body.links.push(SimpleLink {
            world_pose: Isometry3::identity(),
            mass: None,
            inertial_offset: None,
            vertices: vec![
                Point3::new(-0.3, -0.2, 0.0),
                Point3::new(0.3, -0.2, 0.0),
                Point3::new(0.3, 0.2, 0.0),
                Point3::new(-0.3, 0.2, 0.0),
            ],
        });
        body.links.push(SimpleLink {
            world_pose: Isometry3::from_parts(
                Translation3::new(0.0, 0.12, 0.9),
                UnitQuaternion::identity(),
            ),
            mass: Some(20.0),
            inertial_offset: Some(Vector3::new(0.0, 0.0, 0.1)),
            vertices: vec![],
        });

        if let Some(analysis) = analyze(&body, 0.1) {
            println!(
                "Footprint hull has {} corners, centroid ({:.3}, {:.3}), COM z {:.3}",
                analysis.hull.len(),
                analysis.centroid.x,
                analysis.centroid.y,
                analysis.com.z
            );
            if let Some(correction) = solve(&analysis, AxisChoice::Major, 0.2) {
                println!(
                    "Balance correction: {:.4} rad about ({:.2}, {:.2}, {:.2})",
                    correction.angle, correction.axis.x, correction.axis.y, correction.axis.z
                );
                apply_as_residual(&mut editor, 3, &correction)?;
                println!("Frame 3 after the correction:");
                dump_pose(&editor.combined_state(3).expect("frame within range").base);
            }
        }
    }

    println!("Combined CSV export:\n{}", editor.export_csv(ExportMode::Combined));
    Ok(())
}

use anyhow::Result;
use ndarray::{arr1, arr2, Array1, Array2, ArrayD};
use rand::{rngs::StdRng, SeedableRng};
use replay_candle::{util::tensor_to_arrayd, TransitionBuffer};
use replay_core::{
    ActionKind, Actions, Dataset, ExperienceBufferBase, ReplayBufferBase, ReplayBufferConfig,
    ReplayError, Transition,
};
use std::collections::HashSet;
use test_log::test;

fn discrete_config(capacity: Option<usize>) -> ReplayBufferConfig {
    ReplayBufferConfig::default()
        .state_shape(vec![1])
        .action_kind(ActionKind::Discrete)
        .capacity(capacity)
}

fn state(x: f32) -> ArrayD<f32> {
    arr1(&[x]).into_dyn()
}

/// Inserts a transition whose fields all derive from `i`.
fn insert(buffer: &mut TransitionBuffer, i: usize) -> Result<()> {
    let x = i as f32;
    buffer.insert_transition(
        state(x).view(),
        i as i64,
        state(x + 0.5).view(),
        x * 10.0,
        i % 2 == 1,
    )
}

fn states(buffer: &mut TransitionBuffer) -> Result<Vec<f32>> {
    let batch = buffer.sample(None, false)?;
    Ok(batch.state.flatten_all()?.to_vec1::<f32>()?)
}

#[test]
fn test_overwrite_scenario() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(Some(3)))?;
    for i in 0..4 {
        insert(&mut buffer, i)?;
    }

    assert_eq!(states(&mut buffer)?, vec![3., 1., 2.]);
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.total_inserted(), 4);
    assert_eq!(buffer.write_cursor(), 1);

    let batch = buffer.sample(None, false)?;
    assert_eq!(batch.action.to_vec2::<i64>()?, vec![vec![3i64], vec![1], vec![2]]);
    assert_eq!(
        batch.next_state.flatten_all()?.to_vec1::<f32>()?,
        vec![3.5, 1.5, 2.5]
    );
    assert_eq!(batch.reward.to_vec2::<f32>()?, vec![vec![30f32], vec![10.], vec![20.]]);
    assert_eq!(batch.done.to_vec2::<f32>()?, vec![vec![1f32], vec![1.], vec![0.]]);
    Ok(())
}

#[test]
fn test_capacity_invariant() -> Result<()> {
    for capacity in [1, 2, 5] {
        let mut buffer = TransitionBuffer::build(&discrete_config(Some(capacity)))?;
        for i in 0..12 {
            insert(&mut buffer, i)?;
            assert_eq!(buffer.total_inserted(), i + 1);
            assert_eq!(buffer.len(), (i + 1).min(capacity));
        }
    }
    Ok(())
}

#[test]
fn test_overwrite_keeps_most_recent() -> Result<()> {
    let capacity = 4;
    for k in 1..9 {
        let mut buffer = TransitionBuffer::build(&discrete_config(Some(capacity)))?;
        let n = capacity + k;
        for i in 0..n {
            insert(&mut buffer, i)?;
        }

        // Slot j holds the most recent insertion i with i % capacity == j.
        let expected = (0..capacity)
            .map(|j| ((n - 1 - j) / capacity * capacity + j) as f32)
            .collect::<Vec<_>>();
        assert_eq!(states(&mut buffer)?, expected);

        let kept = states(&mut buffer)?
            .into_iter()
            .map(|x| x as usize)
            .collect::<HashSet<_>>();
        assert_eq!(kept, (n - capacity..n).collect::<HashSet<_>>());
    }
    Ok(())
}

#[test]
fn test_unbounded() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(None))?;
    for i in 0..1000 {
        insert(&mut buffer, i)?;
    }
    assert_eq!(buffer.capacity(), None);
    assert_eq!(buffer.len(), 1000);
    assert_eq!(buffer.total_inserted(), 1000);
    assert_eq!(buffer.write_cursor(), 1000);
    assert_eq!(
        states(&mut buffer)?,
        (0..1000).map(|i| i as f32).collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn test_sample_size_and_permutation() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(Some(20)))?;
    for i in 0..13 {
        insert(&mut buffer, i)?;
    }

    for b in [0, 1, 5, 13, 14, 100] {
        let batch = buffer.sample(Some(b), true)?;
        assert_eq!(batch.len(), b.min(13));
        assert_eq!(batch.state.dims()[0], b.min(13));
        assert_eq!(batch.reward.dims()[0], b.min(13));
    }

    let all = (0..13).collect::<HashSet<_>>();
    for _ in 0..10 {
        let batch = buffer.sample(None, true)?;
        assert_eq!(batch.ix_sample.iter().copied().collect::<HashSet<_>>(), all);

        // Rows follow the sampled slots.
        let s = batch.state.flatten_all()?.to_vec1::<f32>()?;
        let expected = batch.ix_sample.iter().map(|&ix| ix as f32).collect::<Vec<_>>();
        assert_eq!(s, expected);
    }
    Ok(())
}

#[test]
fn test_sample_does_not_change_contents() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(Some(3)))?;
    for i in 0..5 {
        insert(&mut buffer, i)?;
    }
    let before = states(&mut buffer)?;
    let _ = buffer.sample(Some(2), true)?;
    let _ = buffer.sample_with(&mut StdRng::seed_from_u64(1), None, true)?;
    assert_eq!(states(&mut buffer)?, before);
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.total_inserted(), 5);
    Ok(())
}

#[test]
fn test_sample_with_is_reproducible() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(None))?;
    for i in 0..50 {
        insert(&mut buffer, i)?;
    }
    let b1 = buffer.sample_with(&mut StdRng::seed_from_u64(7), Some(10), true)?;
    let b2 = buffer.sample_with(&mut StdRng::seed_from_u64(7), Some(10), true)?;
    assert_eq!(b1.ix_sample, b2.ix_sample);
    Ok(())
}

#[test]
fn test_clear() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(Some(3)))?;
    for i in 0..5 {
        insert(&mut buffer, i)?;
    }
    buffer.clear()?;
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.total_inserted(), 0);
    assert_eq!(buffer.write_cursor(), 0);

    let batch = buffer.sample(None, true)?;
    assert!(batch.is_empty());
    assert_eq!(batch.state.dims(), &[0, 1]);
    assert_eq!(batch.action.dims(), &[0, 1]);
    assert_eq!(batch.reward.dims(), &[0, 1]);

    // Starts over from slot 0.
    insert(&mut buffer, 9)?;
    assert_eq!(states(&mut buffer)?, vec![9.]);
    Ok(())
}

#[test]
fn test_clear_unbounded() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(None))?;
    for i in 0..600 {
        insert(&mut buffer, i)?;
    }
    buffer.clear()?;
    assert!(buffer.is_empty());
    for i in 0..3 {
        insert(&mut buffer, i)?;
    }
    assert_eq!(states(&mut buffer)?, vec![0., 1., 2.]);
    Ok(())
}

#[test]
fn test_batch_equals_sequential() -> Result<()> {
    let n = 7;
    let s = Array2::from_shape_fn((n, 1), |(i, _)| i as f32);
    let a = Array1::from_shape_fn(n, |i| i as i64);
    let r = Array1::from_shape_fn(n, |i| i as f32 * 10.0);
    let d = Array1::from_shape_fn(n, |i| i % 2 == 1);

    let mut b1 = TransitionBuffer::build(&discrete_config(Some(3)))?;
    b1.insert_batch(
        s.view().into_dyn(),
        &Actions::Discrete(a.clone()),
        (&s + 0.5).view().into_dyn(),
        r.view(),
        d.view(),
    )?;

    let mut b2 = TransitionBuffer::build(&discrete_config(Some(3)))?;
    for i in 0..n {
        insert(&mut b2, i)?;
    }

    assert_eq!(b1.len(), b2.len());
    assert_eq!(b1.total_inserted(), b2.total_inserted());
    assert_eq!(b1.write_cursor(), b2.write_cursor());
    let (s1, a1, n1, r1, d1) = b1.sample(None, false)?.unpack();
    let (s2, a2, n2, r2, d2) = b2.sample(None, false)?.unpack();
    assert_eq!(tensor_to_arrayd::<f32>(&s1)?, tensor_to_arrayd::<f32>(&s2)?);
    assert_eq!(tensor_to_arrayd::<i64>(&a1)?, tensor_to_arrayd::<i64>(&a2)?);
    assert_eq!(tensor_to_arrayd::<f32>(&n1)?, tensor_to_arrayd::<f32>(&n2)?);
    assert_eq!(tensor_to_arrayd::<f32>(&r1)?, tensor_to_arrayd::<f32>(&r2)?);
    assert_eq!(tensor_to_arrayd::<f32>(&d1)?, tensor_to_arrayd::<f32>(&d2)?);
    Ok(())
}

#[test]
fn test_dataset_equals_sequential() -> Result<()> {
    let n = 5;
    let dataset = Dataset::new()
        .with(
            Dataset::OBSERVATIONS,
            Array2::from_shape_fn((n, 1), |(i, _)| i as f32).into_dyn(),
        )
        .with(
            Dataset::ACTIONS,
            Array1::from_shape_fn(n, |i| i as i64).into_dyn(),
        )
        .with(
            Dataset::NEXT_OBSERVATIONS,
            Array2::from_shape_fn((n, 1), |(i, _)| i as f32 + 0.5).into_dyn(),
        )
        .with(
            Dataset::REWARDS,
            Array1::from_shape_fn(n, |i| i as f32 * 10.0).into_dyn(),
        )
        .with(
            Dataset::TERMINALS,
            Array1::from_shape_fn(n, |i| i % 2 == 1).into_dyn(),
        )
        .with("timeouts", Array1::from_elem(n, false).into_dyn());

    let mut b1 = TransitionBuffer::build(&discrete_config(Some(4)))?;
    b1.insert_dataset(&dataset)?;

    let mut b2 = TransitionBuffer::build(&discrete_config(Some(4)))?;
    for i in 0..n {
        insert(&mut b2, i)?;
    }

    assert_eq!(b1.total_inserted(), b2.total_inserted());
    assert_eq!(states(&mut b1)?, states(&mut b2)?);
    assert_eq!(
        tensor_to_arrayd::<i64>(&b1.whole_actions()?)?,
        tensor_to_arrayd::<i64>(&b2.whole_actions()?)?
    );
    assert_eq!(b1.sum_rewards()?, b2.sum_rewards()?);
    assert_eq!(b1.num_done_flags()?, b2.num_done_flags()?);
    Ok(())
}

#[test]
fn test_dataset_without_rows() -> Result<()> {
    let dataset = Dataset::new()
        .with(Dataset::OBSERVATIONS, Array2::<f32>::zeros((0, 1)).into_dyn())
        .with(Dataset::ACTIONS, Array1::<i64>::zeros(0).into_dyn())
        .with(Dataset::NEXT_OBSERVATIONS, Array2::<f32>::zeros((0, 1)).into_dyn())
        .with(Dataset::REWARDS, Array1::<f32>::zeros(0).into_dyn())
        .with(Dataset::TERMINALS, Array1::from_elem(0, false).into_dyn());

    // Statistics are logged after insertion and never turn it into an error.
    log::set_max_level(log::LevelFilter::Info);
    let mut buffer = TransitionBuffer::build(&discrete_config(Some(4)))?;
    buffer.insert_dataset(&dataset)?;
    assert!(buffer.is_empty());
    assert_eq!(buffer.total_inserted(), 0);
    assert_eq!(buffer.sum_rewards()?, 0.0);
    Ok(())
}

#[test]
fn test_dataset_missing_field() -> Result<()> {
    let dataset = Dataset::new()
        .with(Dataset::OBSERVATIONS, arr2(&[[0f32]]).into_dyn())
        .with(Dataset::ACTIONS, arr1(&[0i64]).into_dyn())
        .with(Dataset::REWARDS, arr1(&[0f32]).into_dyn())
        .with(Dataset::TERMINALS, arr1(&[false]).into_dyn());

    let mut buffer = TransitionBuffer::build(&discrete_config(Some(4)))?;
    let err = buffer.insert_dataset(&dataset).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReplayError>(),
        Some(&ReplayError::MissingField("next_observations".to_string()))
    );
    assert!(buffer.is_empty());
    Ok(())
}

#[test]
fn test_shape_mismatch() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(Some(4)))?;
    let bad = arr1(&[0f32, 1.]).into_dyn();
    let err = buffer
        .insert_transition(bad.view(), 0i64, state(0.).view(), 0., false)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReplayError>(),
        Some(&ReplayError::ShapeMismatch {
            field: "states",
            expected: vec![1, 1],
            actual: vec![1, 2],
        })
    );

    let err = buffer
        .insert_transition(state(0.).view(), vec![0.5f32], state(0.).view(), 0., false)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReplayError>(),
        Some(&ReplayError::ActionKindMismatch {
            expected: ActionKind::Discrete,
            actual: ActionKind::Continuous,
        })
    );
    assert_eq!(buffer.total_inserted(), 0);
    Ok(())
}

#[test]
fn test_batch_is_checked_before_insertion() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(None))?;
    let s = arr2(&[[0f32], [1.], [2.]]).into_dyn();
    let err = buffer
        .insert_batch(
            s.view(),
            &Actions::Discrete(arr1(&[0, 1, 2])),
            s.view(),
            arr1(&[0f32, 1., 2.]).view(),
            arr1(&[false, true]).view(),
        )
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReplayError>(),
        Some(&ReplayError::RowCountMismatch {
            field: "dones",
            expected: 3,
            actual: 2,
        })
    );
    assert!(buffer.is_empty());
    assert_eq!(buffer.total_inserted(), 0);
    Ok(())
}

#[test]
fn test_continuous_actions() -> Result<()> {
    let config = ReplayBufferConfig::default()
        .state_shape(vec![2, 2])
        .action_shape(vec![3])
        .action_kind(ActionKind::Continuous)
        .capacity(Some(2));
    let mut buffer = TransitionBuffer::build(&config)?;

    for i in 0..3 {
        let x = i as f32;
        let s = ArrayD::from_elem(vec![2, 2], x);
        buffer.push(Transition::new(
            s.clone(),
            vec![x, x + 1., x + 2.],
            s,
            1.0,
            false,
        ))?;
    }

    let batch = buffer.sample(None, false)?;
    assert_eq!(batch.state.dims(), &[2, 2, 2]);
    assert_eq!(
        batch.action.to_vec2::<f32>()?,
        vec![vec![2f32, 3., 4.], vec![1., 2., 3.]]
    );
    assert_eq!(buffer.sum_rewards()?, 2.0);

    let err = buffer
        .push(Transition::new(
            ArrayD::zeros(vec![2, 2]),
            vec![0f32, 0.],
            ArrayD::zeros(vec![2, 2]),
            0.,
            false,
        ))
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReplayError>(),
        Some(&ReplayError::ShapeMismatch {
            field: "actions",
            expected: vec![1, 3],
            actual: vec![1, 2],
        })
    );
    Ok(())
}

#[test]
fn test_invalid_capacity() {
    let err = TransitionBuffer::build(&discrete_config(Some(0))).err().unwrap();
    assert_eq!(
        err.downcast_ref::<ReplayError>(),
        Some(&ReplayError::InvalidCapacity)
    );
}

#[test]
fn test_statistics() -> Result<()> {
    let mut buffer = TransitionBuffer::build(&discrete_config(Some(10)))?;
    assert_eq!(buffer.sum_rewards()?, 0.0);
    assert_eq!(buffer.num_done_flags()?, 0);
    for i in 0..4 {
        insert(&mut buffer, i)?;
    }
    assert_eq!(buffer.sum_rewards()?, 60.0);
    assert_eq!(buffer.num_done_flags()?, 2);
    assert_eq!(
        buffer.whole_actions()?.to_vec2::<i64>()?,
        vec![vec![0i64], vec![1], vec![2], vec![3]]
    );
    Ok(())
}

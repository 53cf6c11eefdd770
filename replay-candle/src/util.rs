//! Conversion between host arrays and device tensors.
use anyhow::Result;
use candle_core::{Device, Tensor, WithDType};
use ndarray::{ArrayD, ArrayView1, ArrayViewD, IxDyn};
use num_traits::AsPrimitive;
use replay_core::{ActionKind, Actions, ReplayError};

/// Converts an array into a tensor on the given device, casting the elements.
pub fn arrayd_to_tensor<T1, T2>(a: ArrayViewD<T1>, device: &Device) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let shape = a.shape().to_vec();
    let v = a.iter().map(|e| e.as_()).collect::<Vec<T2>>();
    Ok(Tensor::from_vec(v, shape, device)?)
}

/// Converts a tensor into an array in host memory.
pub fn tensor_to_arrayd<T>(t: &Tensor) -> Result<ArrayD<T>>
where
    T: WithDType,
{
    let shape = t.dims().to_vec();
    let v: Vec<T> = t.flatten_all()?.to_vec1()?;
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), v)?)
}

/// Fails unless `actual` is `[n, shape..]`.
fn check_rows_shape(
    field: &'static str,
    n: usize,
    shape: &[usize],
    actual: &[usize],
) -> Result<()> {
    if actual.first() != Some(&n) || &actual[1..] != shape {
        let mut expected = vec![n];
        expected.extend_from_slice(shape);
        return Err(ReplayError::ShapeMismatch {
            field,
            expected,
            actual: actual.to_vec(),
        }
        .into());
    }
    Ok(())
}

/// Returns the number of rows of a batch of states.
pub(crate) fn num_rows(states: &ArrayViewD<f32>, shape: &[usize]) -> Result<usize> {
    let n = states.shape().first().copied().unwrap_or(0);
    if states.ndim() == 0 {
        let mut expected = vec![1];
        expected.extend_from_slice(shape);
        return Err(ReplayError::ShapeMismatch {
            field: "states",
            expected,
            actual: vec![],
        }
        .into());
    }
    check_rows_shape("states", n, shape, states.shape())?;
    Ok(n)
}

/// Converts `n` states into an `f32` tensor of shape `[n, shape..]`.
pub(crate) fn states_to_tensor(
    field: &'static str,
    states: ArrayViewD<f32>,
    n: usize,
    shape: &[usize],
    device: &Device,
) -> Result<Tensor> {
    check_rows_shape(field, n, shape, states.shape())?;
    arrayd_to_tensor::<f32, f32>(states, device)
}

/// Converts `n` actions into the stored representation.
///
/// Discrete actions become an `i64` tensor of shape `[n, 1]`; continuous ones
/// an `f32` tensor of shape `[n, shape..]`.
pub(crate) fn actions_to_tensor(
    actions: &Actions,
    kind: ActionKind,
    n: usize,
    shape: &[usize],
    device: &Device,
) -> Result<Tensor> {
    if actions.kind() != kind {
        return Err(ReplayError::ActionKindMismatch {
            expected: kind,
            actual: actions.kind(),
        }
        .into());
    }
    if actions.len() != n {
        return Err(ReplayError::RowCountMismatch {
            field: "actions",
            expected: n,
            actual: actions.len(),
        }
        .into());
    }

    match actions {
        Actions::Discrete(labels) => Ok(Tensor::from_vec(labels.to_vec(), (n, 1), device)?),
        Actions::Continuous(a) => {
            check_rows_shape("actions", n, shape, a.shape())?;
            arrayd_to_tensor::<f32, f32>(a.view(), device)
        }
    }
}

/// Converts `n` per-row scalars into an `f32` tensor of shape `[n, 1]`.
pub(crate) fn column_to_tensor(
    field: &'static str,
    values: ArrayView1<f32>,
    n: usize,
    device: &Device,
) -> Result<Tensor> {
    if values.len() != n {
        return Err(ReplayError::RowCountMismatch {
            field,
            expected: n,
            actual: values.len(),
        }
        .into());
    }
    Ok(Tensor::from_vec(values.to_vec(), (n, 1), device)?)
}

/// Converts `n` flags into an `f32` tensor of shape `[n, 1]`.
pub(crate) fn flags_to_tensor(
    field: &'static str,
    flags: ArrayView1<bool>,
    n: usize,
    device: &Device,
) -> Result<Tensor> {
    let values = flags.mapv(|f| if f { 1f32 } else { 0f32 });
    column_to_tensor(field, values.view(), n, device)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_array_tensor_conversion() -> Result<()> {
        let a = arr2(&[[1i64, 2, 3], [4, 5, 6]]).into_dyn();
        let t = arrayd_to_tensor::<i64, f32>(a.view(), &Device::Cpu)?;
        assert_eq!(t.dims(), &[2, 3]);
        assert_eq!(t.dtype(), candle_core::DType::F32);
        let b = tensor_to_arrayd::<f32>(&t)?;
        assert_eq!(b, a.mapv(|x| x as f32));
        Ok(())
    }

    #[test]
    fn test_state_shape_mismatch() {
        let s = arr2(&[[0f32, 1., 2.]]).into_dyn();
        let err = num_rows(&s.view(), &[2]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReplayError>(),
            Some(&ReplayError::ShapeMismatch {
                field: "states",
                expected: vec![1, 2],
                actual: vec![1, 3],
            })
        );
    }

    #[test]
    fn test_discrete_actions() -> Result<()> {
        let a = Actions::Discrete(arr1(&[3, 1]));
        let t = actions_to_tensor(&a, ActionKind::Discrete, 2, &[4], &Device::Cpu)?;
        assert_eq!(t.to_vec2::<i64>()?, vec![vec![3i64], vec![1]]);

        let err = actions_to_tensor(&a, ActionKind::Continuous, 2, &[4], &Device::Cpu)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReplayError>(),
            Some(&ReplayError::ActionKindMismatch {
                expected: ActionKind::Continuous,
                actual: ActionKind::Discrete,
            })
        );
        Ok(())
    }

    #[test]
    fn test_flags() -> Result<()> {
        let t = flags_to_tensor("dones", arr1(&[true, false]).view(), 2, &Device::Cpu)?;
        assert_eq!(t.to_vec2::<f32>()?, vec![vec![1f32], vec![0.]]);
        assert!(flags_to_tensor("dones", arr1(&[true]).view(), 2, &Device::Cpu).is_err());
        Ok(())
    }
}

//! The hierarchical container format (`.h5` extension).
//!
//! One dataset per parameter, keyed by the parameter's full path, holding the
//! values widened to f64 plus two attributes: the `need_grad` flag and a
//! write-order `index`. The dataset table itself is unordered, so `index`
//! alone carries the traversal order across a round-trip.

use std::collections::HashMap;
use std::io::{Read, Write};

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::ParamError;
use crate::store::ParameterStore;

#[derive(Debug, Serialize, Deserialize)]
struct Dataset {
    shape: Vec<usize>,
    data: Vec<f64>,
    need_grad: bool,
    index: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Container {
    datasets: HashMap<String, Dataset>,
}

fn bin_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

/// Writes every parameter under the store's current scope, including those
/// with `need_grad == false`.
pub fn save<W: Write>(store: &ParameterStore, writer: &mut W) -> Result<(), ParamError> {
    let mut container = Container::default();
    for (index, (path, var)) in store.get_parameters(false).into_iter().enumerate() {
        container.datasets.insert(
            path,
            Dataset {
                shape: var.shape().to_vec(),
                data: var.to_flat_vec().into_iter().map(f64::from).collect(),
                need_grad: var.need_grad(),
                index: Some(index as u64),
            },
        );
    }

    bincode::serde::encode_into_std_write(&container, writer, bin_config())
        .map_err(|err| ParamError::Encode(err.to_string()))?;
    Ok(())
}

/// Reads a container and registers its datasets in the store, in the order
/// recorded by their `index` attributes. Datasets without an index sort after
/// indexed ones, by path, so the result stays deterministic either way.
///
/// Existing variables keep their `need_grad` flag; the dataset's flag only
/// takes effect on creation. Values are narrowed from f64 on the way in.
pub fn load<R: Read>(store: &ParameterStore, reader: &mut R) -> Result<(), ParamError> {
    let container: Container = bincode::serde::decode_from_std_read(reader, bin_config())
        .map_err(|err| ParamError::Decode(err.to_string()))?;

    let mut datasets: Vec<(String, Dataset)> = container.datasets.into_iter().collect();
    datasets.sort_by(|(path_a, a), (path_b, b)| match (a.index, b.index) {
        (Some(a), Some(b)) => a.cmp(&b).then_with(|| path_a.cmp(path_b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => path_a.cmp(path_b),
    });

    for (path, dataset) in datasets {
        let var = store.get_parameter_or_create(&path, &dataset.shape, None, dataset.need_grad)?;
        let values: Vec<f32> = dataset.data.into_iter().map(|v| v as f32).collect();
        let values = ArrayD::from_shape_vec(IxDyn(&dataset.shape), values)
            .map_err(|err| ParamError::Decode(err.to_string()))?;
        var.set_data(values);
    }
    Ok(())
}

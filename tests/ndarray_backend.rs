#![cfg(feature = "ndarray")]

use fedprox::{AdamConfig, NdParam, OptimErr, Parameter, ProximalAdam, ProximalSgd, SgdConfig};
use ndarray::{ArrayD, IxDyn, array};

#[test]
fn sgd_updates_matrices_in_place() {
    let weight = array![[1.0_f32, 2.0], [3.0, 4.0]].into_dyn();
    let bias = array![0.5_f32].into_dyn();
    let mut params = [NdParam::new(weight), NdParam::new(bias)];

    let mut opt = ProximalSgd::new(&params, SgdConfig::new(0.5, 0.0)).unwrap();
    params[0].set_grad(ArrayD::ones(IxDyn(&[2, 2])));
    opt.step(&mut params).unwrap();

    assert_eq!(params[0].value().shape(), &[2, 2]);
    assert_eq!(params[0].values(), &[0.5, 1.5, 2.5, 3.5]);
    assert_eq!(params[1].values(), &[0.5]);
}

#[test]
fn gradient_with_the_same_length_but_another_shape_is_rejected() {
    let mut params = [NdParam::new(ArrayD::<f64>::zeros(IxDyn(&[2, 2])))];
    let mut opt = ProximalAdam::new(&params, AdamConfig::new(0.1, 0.1)).unwrap();

    params[0].set_grad(ArrayD::ones(IxDyn(&[4])));
    let err = opt.step(&mut params).unwrap_err();

    let OptimErr::ShapeMismatch { got, expected, .. } = err else {
        panic!("expected a shape mismatch, got {err}");
    };
    assert_eq!(got, vec![4]);
    assert_eq!(expected, vec![2, 2]);
    assert_eq!(params[0].values(), &[0.0; 4]);
}

#[test]
fn transposed_gradients_line_up_with_the_values() {
    let mut params = [NdParam::new(array![[1.0_f64, 2.0], [3.0, 4.0]].into_dyn())];
    let mut opt = ProximalSgd::new(&params, SgdConfig::new(1.0, 0.0)).unwrap();

    let grad = array![[1.0_f64, 3.0], [2.0, 4.0]].reversed_axes().into_dyn();
    params[0].set_grad(grad);
    opt.step(&mut params).unwrap();

    assert_eq!(params[0].values(), &[0.0; 4]);
}

#[test]
fn proximal_adam_anchors_on_the_reference() {
    let mut params = [NdParam::new(array![[10.0_f64]].into_dyn())];
    let mut opt = ProximalAdam::new(&params, AdamConfig::new(0.1, 1.0)).unwrap();
    opt.set_global_reference(&params).unwrap();

    params[0].value_mut().fill(12.0);
    params[0].set_grad(ArrayD::zeros(IxDyn(&[1, 1])));
    opt.step(&mut params).unwrap();

    let after = params[0].values()[0];
    assert!(after < 12.0 && after > 10.0);
    assert_eq!(opt.state(0).unwrap().reference(), &[10.0]);
}
